//! Built-in reference modules
//!
//! Resource modules are normally external to the broker; this one ships
//! in-tree as a working reference for the `ServiceModule` contract and to
//! give the CLI something to serve out of the box.

mod keyval;

pub use keyval::KeyvalModule;
