// src/handlers/scopes.rs
//
// O catálogo de escopos: services, resources e actions. As três
// entidades têm o mesmo CRUD, mais o import idempotente de defaults.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    config::AppState,
    middleware::rbac::{RequireScope, ScopeCatalogManage, ScopeTenantRead},
    models::scope::{
        Action, CreateScopeEntryPayload, ImportReport, Resource, ScopeFilter, Service,
        UpdateScopeEntryPayload,
    },
};

// ---
// Services
// ---

#[utoipa::path(
    post,
    path = "/api/scopes/services",
    tag = "Catálogo",
    request_body = CreateScopeEntryPayload,
    responses(
        (status = 201, description = "Service criado", body = Service),
        (status = 409, description = "code duplicado no escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_service(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Json(payload): Json<CreateScopeEntryPayload>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    let service = app_state.scope_service.create_service(&payload).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

#[utoipa::path(
    get,
    path = "/api/scopes/services",
    tag = "Catálogo",
    params(ScopeFilter, ListParams),
    responses((status = 200, description = "Página de services")),
    security(("api_jwt" = []))
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Query(filter): Query<ScopeFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Service>>, AppError> {
    Ok(Json(app_state.scope_service.list_services(&filter, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/scopes/services/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do service")),
    responses((status = 200, description = "O service", body = Service)),
    security(("api_jwt" = []))
)]
pub async fn get_service(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, AppError> {
    Ok(Json(app_state.scope_service.get_service(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/scopes/services/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do service")),
    request_body = UpdateScopeEntryPayload,
    responses((status = 200, description = "Service atualizado (code imutável)", body = Service)),
    security(("api_jwt" = []))
)]
pub async fn update_service(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScopeEntryPayload>,
) -> Result<Json<Service>, AppError> {
    Ok(Json(app_state.scope_service.update_service(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/scopes/services/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do service")),
    responses(
        (status = 204, description = "Service apagado"),
        (status = 409, description = "Ainda referenciado por permissões")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_service(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.scope_service.delete_service(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Resources
// ---

#[utoipa::path(
    post,
    path = "/api/scopes/resources",
    tag = "Catálogo",
    request_body = CreateScopeEntryPayload,
    responses((status = 201, description = "Resource criado", body = Resource)),
    security(("api_jwt" = []))
)]
pub async fn create_resource(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Json(payload): Json<CreateScopeEntryPayload>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    let resource = app_state.scope_service.create_resource(&payload).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

#[utoipa::path(
    get,
    path = "/api/scopes/resources",
    tag = "Catálogo",
    params(ScopeFilter, ListParams),
    responses((status = 200, description = "Página de resources")),
    security(("api_jwt" = []))
)]
pub async fn list_resources(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Query(filter): Query<ScopeFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Resource>>, AppError> {
    Ok(Json(app_state.scope_service.list_resources(&filter, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/scopes/resources/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do resource")),
    responses((status = 200, description = "O resource", body = Resource)),
    security(("api_jwt" = []))
)]
pub async fn get_resource(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Resource>, AppError> {
    Ok(Json(app_state.scope_service.get_resource(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/scopes/resources/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do resource")),
    request_body = UpdateScopeEntryPayload,
    responses((status = 200, description = "Resource atualizado", body = Resource)),
    security(("api_jwt" = []))
)]
pub async fn update_resource(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScopeEntryPayload>,
) -> Result<Json<Resource>, AppError> {
    Ok(Json(app_state.scope_service.update_resource(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/scopes/resources/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID do resource")),
    responses(
        (status = 204, description = "Resource apagado"),
        (status = 409, description = "Ainda referenciado por permissões")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_resource(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.scope_service.delete_resource(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Actions
// ---

#[utoipa::path(
    post,
    path = "/api/scopes/actions",
    tag = "Catálogo",
    request_body = CreateScopeEntryPayload,
    responses((status = 201, description = "Action criada", body = Action)),
    security(("api_jwt" = []))
)]
pub async fn create_action(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Json(payload): Json<CreateScopeEntryPayload>,
) -> Result<(StatusCode, Json<Action>), AppError> {
    let action = app_state.scope_service.create_action(&payload).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

#[utoipa::path(
    get,
    path = "/api/scopes/actions",
    tag = "Catálogo",
    params(ScopeFilter, ListParams),
    responses((status = 200, description = "Página de actions")),
    security(("api_jwt" = []))
)]
pub async fn list_actions(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Query(filter): Query<ScopeFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Action>>, AppError> {
    Ok(Json(app_state.scope_service.list_actions(&filter, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/scopes/actions/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID da action")),
    responses((status = 200, description = "A action", body = Action)),
    security(("api_jwt" = []))
)]
pub async fn get_action(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Action>, AppError> {
    Ok(Json(app_state.scope_service.get_action(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/scopes/actions/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID da action")),
    request_body = UpdateScopeEntryPayload,
    responses((status = 200, description = "Action atualizada", body = Action)),
    security(("api_jwt" = []))
)]
pub async fn update_action(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScopeEntryPayload>,
) -> Result<Json<Action>, AppError> {
    Ok(Json(app_state.scope_service.update_action(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/scopes/actions/{id}",
    tag = "Catálogo",
    params(("id" = Uuid, Path, description = "ID da action")),
    responses(
        (status = 204, description = "Action apagada"),
        (status = 409, description = "Ainda referenciada por permissões")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_action(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.scope_service.delete_action(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Import de defaults
// ---

#[utoipa::path(
    post,
    path = "/api/scopes/import-defaults",
    tag = "Catálogo",
    responses((status = 200, description = "Relatório do import", body = ImportReport)),
    security(("api_jwt" = []))
)]
pub async fn import_defaults(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeCatalogManage>,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(app_state.scope_service.import_defaults().await?))
}
