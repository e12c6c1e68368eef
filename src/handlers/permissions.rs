// src/handlers/permissions.rs

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
    middleware::rbac::{RequireScope, ScopePermissionManage, ScopeTenantRead},
    models::permission::{
        CreatePermissionPayload, Permission, PermissionFilter, UpdatePermissionPayload,
    },
    models::scope::ImportReport,
};

#[utoipa::path(
    post,
    path = "/api/permissions",
    tag = "RBAC",
    request_body = CreatePermissionPayload,
    responses(
        (status = 201, description = "Permissão criada (code derivado da tripla)", body = Permission),
        (status = 400, description = "Tripla não existe no catálogo"),
        (status = 409, description = "code duplicado no escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_permission(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopePermissionManage>,
    Json(payload): Json<CreatePermissionPayload>,
) -> Result<(StatusCode, Json<Permission>), AppError> {
    let permission = app_state.permission_service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    params(PermissionFilter, ListParams),
    responses((status = 200, description = "Página de permissões")),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Query(filter): Query<PermissionFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Permission>>, AppError> {
    Ok(Json(app_state.permission_service.list(&filter, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/permissions/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID da permissão")),
    responses((status = 200, description = "A permissão", body = Permission)),
    security(("api_jwt" = []))
)]
pub async fn get_permission(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Permission>, AppError> {
    Ok(Json(app_state.permission_service.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/permissions/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID da permissão")),
    request_body = UpdatePermissionPayload,
    responses((status = 200, description = "Permissão atualizada (tripla imutável)", body = Permission)),
    security(("api_jwt" = []))
)]
pub async fn update_permission(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopePermissionManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePermissionPayload>,
) -> Result<Json<Permission>, AppError> {
    Ok(Json(app_state.permission_service.update(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/permissions/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID da permissão")),
    responses((status = 204, description = "Permissão apagada (desvincula dos cargos)")),
    security(("api_jwt" = []))
)]
pub async fn delete_permission(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopePermissionManage>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.permission_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/permissions/import-defaults",
    tag = "RBAC",
    responses((status = 200, description = "Relatório do import", body = ImportReport)),
    security(("api_jwt" = []))
)]
pub async fn import_defaults(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopePermissionManage>,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(app_state.permission_service.import_defaults().await?))
}
