use std::sync::Arc;

use assets_core::Principal;
use assets_engine::{CreateAsset, ServiceError};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::json_error;
use super::state::AppState;
use crate::commands::lifecycle::lifecycle_json;

/// Header naming the acting user on every `/assets` route.
pub(crate) const ACTOR_HEADER: &str = "x-asset-user";

/// The acting user, taken from [`ACTOR_HEADER`].
pub(crate) struct Actor(pub(crate) String);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Actor(v.to_string()))
            .ok_or_else(|| {
                json_error(StatusCode::UNAUTHORIZED, "missing X-Asset-User header").into_response()
            })
    }
}

#[derive(Deserialize)]
pub(crate) struct SearchParams {
    catalog: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct StatusBody {
    status: String,
}

#[derive(Deserialize)]
pub(crate) struct NameBody {
    name: String,
}

#[derive(Deserialize)]
pub(crate) struct DescriptionBody {
    description: String,
}

#[derive(Deserialize)]
pub(crate) struct CatalogBody {
    catalog: String,
}

/// `principal` is `user:<name>`, `group:<name>` or a bare user name.
#[derive(Deserialize)]
pub(crate) struct RoleMemberBody {
    role: String,
    principal: String,
}

#[derive(Deserialize)]
pub(crate) struct FieldValuesBody {
    #[serde(default)]
    values: Vec<String>,
}

/// HTTP status for a service failure.
pub(crate) fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        ServiceError::AssetNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_conflict() => StatusCode::CONFLICT,
        ServiceError::Lifecycle(_)
        | ServiceError::Asset(_)
        | ServiceError::UnknownCatalog(_)
        | ServiceError::CatalogDisabled(_)
        | ServiceError::NoDeletedStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Storage(_) | ServiceError::UnknownLifecycle { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn service_error(err: ServiceError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    } else {
        debug!(error = %err, status = status.as_u16(), "request rejected");
    }
    json_error(status, &err.to_string()).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => service_error(e),
    }
}

fn parse_principal(raw: &str) -> Result<Principal, Response> {
    raw.parse::<Principal>()
        .map_err(|e| json_error(StatusCode::UNPROCESSABLE_ENTITY, &e).into_response())
}

pub(crate) async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn handle_catalogs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "catalogs": state.service.registry().catalogs() }))
}

pub(crate) async fn handle_lifecycle(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.service.registry().lifecycle(&name) {
        Some(lifecycle) => (StatusCode::OK, Json(lifecycle_json(lifecycle))).into_response(),
        None => json_error(
            StatusCode::NOT_FOUND,
            &format!("Lifecycle '{}' not found", name),
        )
        .into_response(),
    }
}

pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(request): Json<CreateAsset>,
) -> Response {
    respond(
        StatusCode::CREATED,
        state.service.create_asset(&actor, request).await,
    )
}

pub(crate) async fn handle_search(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Query(params): Query<SearchParams>,
) -> Response {
    let result = state
        .service
        .search(&actor, params.catalog.as_deref(), params.status.as_deref())
        .await
        .map(|assets| json!({ "assets": assets }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, state.service.view(&actor, id).await)
}

pub(crate) async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
) -> Response {
    respond(StatusCode::OK, state.service.delete_asset(&actor, id).await)
}

pub(crate) async fn handle_set_status(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Response {
    respond(
        StatusCode::OK,
        state.service.set_status(&actor, id, &body.status).await,
    )
}

pub(crate) async fn handle_set_name(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<NameBody>,
) -> Response {
    respond(
        StatusCode::OK,
        state.service.set_name(&actor, id, &body.name).await,
    )
}

pub(crate) async fn handle_set_description(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<DescriptionBody>,
) -> Response {
    respond(
        StatusCode::OK,
        state
            .service
            .set_description(&actor, id, &body.description)
            .await,
    )
}

pub(crate) async fn handle_set_catalog(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<CatalogBody>,
) -> Response {
    respond(
        StatusCode::OK,
        state.service.set_catalog(&actor, id, &body.catalog).await,
    )
}

pub(crate) async fn handle_add_role_member(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<RoleMemberBody>,
) -> Response {
    let principal = match parse_principal(&body.principal) {
        Ok(p) => p,
        Err(rejection) => return rejection,
    };
    let result = state
        .service
        .add_role_member(&actor, id, &body.role, principal)
        .await
        .map(|members| json!({ "role": body.role, "members": members }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn handle_remove_role_member(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
    Json(body): Json<RoleMemberBody>,
) -> Response {
    let principal = match parse_principal(&body.principal) {
        Ok(p) => p,
        Err(rejection) => return rejection,
    };
    let result = state
        .service
        .remove_role_member(&actor, id, &body.role, principal)
        .await
        .map(|members| json!({ "role": body.role, "members": members }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn handle_set_custom_field(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path((id, field)): Path<(i64, String)>,
    Json(body): Json<FieldValuesBody>,
) -> Response {
    let result = state
        .service
        .set_custom_field(&actor, id, &field, body.values)
        .await
        .map(|values| json!({ "field": field, "values": values }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<i64>,
) -> Response {
    let result = state
        .service
        .history(&actor, id)
        .await
        .map(|changes| json!({ "changes": changes }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assets_core::{AssetError, FromStatus, LifecycleError, Right};
    use assets_storage::StorageError;

    #[test]
    fn gate_rejection_is_unprocessable() {
        let err = ServiceError::Lifecycle(LifecycleError::IllegalTransition {
            lifecycle: "assets".to_string(),
            from: FromStatus::Status("deleted".to_string()),
            to: "new".to_string(),
        });
        assert_eq!(status_for(&err), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&ServiceError::Asset(AssetError::EmptyName)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn permission_and_missing_asset() {
        let denied = ServiceError::PermissionDenied {
            user: "bob".to_string(),
            right: Right::CreateAsset,
            catalog: "General assets".to_string(),
        };
        assert_eq!(status_for(&denied), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&ServiceError::AssetNotFound(4)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn lost_race_is_conflict_and_backend_failure_is_server_error() {
        let conflict = ServiceError::from(StorageError::ConcurrentConflict {
            asset_id: 1,
            expected_version: 0,
        });
        assert_eq!(status_for(&conflict), StatusCode::CONFLICT);
        let backend = ServiceError::from(StorageError::Backend("disk full".to_string()));
        assert_eq!(status_for(&backend), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
