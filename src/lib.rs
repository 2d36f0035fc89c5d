//! harbormaster - a pluggable lifecycle broker for managed resources
//!
//! Exposes a uniform HTTP lifecycle API (provision, bind, unbind, update,
//! deprovision, poll) for heterogeneous resources; each resource kind
//! supplies its deployment logic as a module of named, idempotent steps.
//! The engine runs those steps asynchronously, persists progress at every
//! step boundary, and enforces one writer per instance.

pub mod broker;
pub mod cli;
pub mod codec;
pub mod engine;
pub mod http_server;
pub mod model;
pub mod modules;
pub mod observability;
pub mod pipeline;
pub mod store;
