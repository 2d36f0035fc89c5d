//! Lifecycle HTTP Routes
//!
//! The `/v2` service-instance protocol: provision, update, deprovision,
//! poll, bind, unbind. Provision, update and deprovision are accepted
//! asynchronously (202) and observed through `last_operation`; bind and
//! unbind are synchronous.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::broker::CredentialMap;
use crate::engine::{Engine, PollResponse, ProvisionRequest, UpdateRequest};
use crate::model::{OperationType, ParamMap};

use super::auth::{require_basic_auth, BasicCredentials};
use super::errors::{ApiError, ApiResult};

// ==================
// Shared State
// ==================

/// Broker state shared across handlers
pub struct BrokerState {
    pub engine: Engine,
    pub credentials: BasicCredentials,
}

impl BrokerState {
    pub fn new(engine: Engine, credentials: BasicCredentials) -> Self {
        Self {
            engine,
            credentials,
        }
    }
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct ProvisionBody {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: ParamMap,
    #[serde(default)]
    pub parent_instance_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub parameters: ParamMap,
}

#[derive(Debug, Deserialize)]
pub struct BindBody {
    #[serde(default)]
    pub parameters: ParamMap,
}

#[derive(Debug, Serialize)]
pub struct AcceptedBody {
    pub operation: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BindResponse {
    pub credentials: CredentialMap,
}

#[derive(Debug, Deserialize)]
pub struct AsyncQuery {
    #[serde(default)]
    pub accepts_incomplete: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LastOperationQuery {
    #[serde(default)]
    pub operation: Option<String>,
}

fn require_async(query: &AsyncQuery) -> ApiResult<()> {
    if query.accepts_incomplete == Some(true) {
        Ok(())
    } else {
        Err(ApiError::AsyncRequired)
    }
}

// ==================
// Handlers
// ==================

async fn provision(
    State(state): State<Arc<BrokerState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    headers: HeaderMap,
    Json(body): Json<ProvisionBody>,
) -> ApiResult<(StatusCode, Json<AcceptedBody>)> {
    require_basic_auth(&headers, &state.credentials)?;
    require_async(&query)?;

    let accepted = state.engine.provision(ProvisionRequest {
        instance_id,
        service_id: body.service_id,
        plan_id: body.plan_id,
        parameters: body.parameters,
        parent_instance_id: body.parent_instance_id,
        tags: body.tags,
    })?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedBody {
            operation: accepted.operation.as_str(),
        }),
    ))
}

async fn update(
    State(state): State<Arc<BrokerState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> ApiResult<(StatusCode, Json<AcceptedBody>)> {
    require_basic_auth(&headers, &state.credentials)?;
    require_async(&query)?;

    let accepted = state.engine.update(UpdateRequest {
        instance_id,
        plan_id: body.plan_id,
        parameters: body.parameters,
    })?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedBody {
            operation: accepted.operation.as_str(),
        }),
    ))
}

async fn deprovision(
    State(state): State<Arc<BrokerState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<AcceptedBody>)> {
    require_basic_auth(&headers, &state.credentials)?;
    require_async(&query)?;

    let accepted = state.engine.deprovision(&instance_id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedBody {
            operation: accepted.operation.as_str(),
        }),
    ))
}

async fn last_operation(
    State(state): State<Arc<BrokerState>>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<PollResponse>> {
    require_basic_auth(&headers, &state.credentials)?;

    let requested = match query.operation.as_deref() {
        None => None,
        Some(raw) => Some(
            OperationType::parse(raw)
                .ok_or_else(|| ApiError::InvalidQueryParam(format!("operation={}", raw)))?,
        ),
    };
    let response = state.engine.poll(&instance_id, requested)?;
    Ok(Json(response))
}

async fn bind(
    State(state): State<Arc<BrokerState>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<BindBody>,
) -> ApiResult<(StatusCode, Json<BindResponse>)> {
    require_basic_auth(&headers, &state.credentials)?;

    let credentials = state.engine.bind(&instance_id, &binding_id, body.parameters)?;
    Ok((StatusCode::CREATED, Json(BindResponse { credentials })))
}

async fn unbind(
    State(state): State<Arc<BrokerState>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    require_basic_auth(&headers, &state.credentials)?;

    state.engine.unbind(&instance_id, &binding_id)?;
    Ok(Json(json!({})))
}

// ==================
// Router
// ==================

/// Build the `/v2` lifecycle router.
pub fn broker_routes(state: Arc<BrokerState>) -> Router {
    Router::new()
        .route(
            "/v2/service_instances/:instance_id",
            put(provision).patch(update).delete(deprovision),
        )
        .route(
            "/v2/service_instances/:instance_id/last_operation",
            get(last_operation),
        )
        .route(
            "/v2/service_instances/:instance_id/service_bindings/:binding_id",
            put(bind).delete(unbind),
        )
        .with_state(state)
}
