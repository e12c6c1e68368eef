// src/handlers/roles.rs

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
    middleware::rbac::{RequireScope, ScopeRoleManage, ScopeTenantRead},
    models::auth::User,
    models::role::{
        CreateRolePayload, PermissionBatchPayload, Role, RoleDetail, RoleFilter,
        UpdateRolePayload, UserBatchPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Cargo criado", body = Role),
        (status = 409, description = "code duplicado no escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = app_state.role_service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "RBAC",
    params(RoleFilter, ListParams),
    responses((status = 200, description = "Página de cargos")),
    security(("api_jwt" = []))
)]
pub async fn list_roles(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Query(filter): Query<RoleFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Role>>, AppError> {
    Ok(Json(app_state.role_service.list(&filter, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    responses((status = 200, description = "Cargo + permissões + contagem de usuários", body = RoleDetail)),
    security(("api_jwt" = []))
)]
pub async fn get_role(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleDetail>, AppError> {
    Ok(Json(app_state.role_service.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    request_body = UpdateRolePayload,
    responses((status = 200, description = "Cargo atualizado", body = Role)),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<Role>, AppError> {
    Ok(Json(app_state.role_service.update(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    responses(
        (status = 204, description = "Cargo apagado"),
        (status = 403, description = "Cargo de sistema é protegido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.role_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Cargo padrão
// ---

#[utoipa::path(
    post,
    path = "/api/roles/{id}/set-default",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    responses((status = 200, description = "Agora é o (único) padrão do escopo", body = Role)),
    security(("api_jwt" = []))
)]
pub async fn set_default(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
) -> Result<Json<Role>, AppError> {
    Ok(Json(app_state.role_service.set_default(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/roles/{id}/unset-default",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    responses((status = 200, description = "Padrão desmarcado", body = Role)),
    security(("api_jwt" = []))
)]
pub async fn unset_default(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
) -> Result<Json<Role>, AppError> {
    Ok(Json(app_state.role_service.unset_default(id).await?))
}

// ---
// Lotes de permissões
// ---

#[utoipa::path(
    post,
    path = "/api/roles/{id}/assign-permissions",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    request_body = PermissionBatchPayload,
    responses(
        (status = 200, description = "Lote atribuído (idempotente)", body = RoleDetail),
        (status = 400, description = "Algum id do lote não existe: nada foi aplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_permissions(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermissionBatchPayload>,
) -> Result<Json<RoleDetail>, AppError> {
    Ok(Json(
        app_state
            .role_service
            .assign_permissions(id, &payload.permission_ids)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/roles/{id}/remove-permissions",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    request_body = PermissionBatchPayload,
    responses((status = 200, description = "Lote removido", body = RoleDetail)),
    security(("api_jwt" = []))
)]
pub async fn remove_permissions(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermissionBatchPayload>,
) -> Result<Json<RoleDetail>, AppError> {
    Ok(Json(
        app_state
            .role_service
            .remove_permissions(id, &payload.permission_ids)
            .await?,
    ))
}

// ---
// Lotes de usuários
// ---

#[utoipa::path(
    post,
    path = "/api/roles/{id}/assign-users",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    request_body = UserBatchPayload,
    responses((status = 204, description = "Lote atribuído (idempotente)")),
    security(("api_jwt" = []))
)]
pub async fn assign_users(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserBatchPayload>,
) -> Result<StatusCode, AppError> {
    app_state.role_service.assign_users(id, &payload.user_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/roles/{id}/remove-users",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo")),
    request_body = UserBatchPayload,
    responses((status = 204, description = "Lote removido")),
    security(("api_jwt" = []))
)]
pub async fn remove_users(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeRoleManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserBatchPayload>,
) -> Result<StatusCode, AppError> {
    app_state.role_service.remove_users(id, &payload.user_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}/users",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "ID do cargo"), ListParams),
    responses((status = 200, description = "Usuários que possuem o cargo")),
    security(("api_jwt" = []))
)]
pub async fn list_role_users(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<User>>, AppError> {
    Ok(Json(app_state.role_service.list_users(id, &params).await?))
}
