// src/handlers/tenancy.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    config::AppState,
    middleware::rbac::{
        RequireScope, ScopeMemberManage, ScopeQuotaManage, ScopeSettingsManage,
        ScopeTenantManage, ScopeTenantRead,
    },
    models::tenancy::{
        AddMemberPayload, CreateTenantPayload, DeleteTenantPayload, Tenant, TenantFilter,
        TenantQuota, TenantSettings, TenantUser, UpdateMemberPayload, UpdateQuotaPayload,
        UpdateSettingsPayload, UpdateTenantPayload,
    },
};

// ---
// Tenants
// ---

#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Tenant criado com quota, settings e owner", body = Tenant),
        (status = 409, description = "slug ou subdomain já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantManage>,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<(StatusCode, Json<Tenant>), AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let tenant = app_state.tenant_service.create_tenant(&payload).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    params(TenantFilter, ListParams),
    responses((status = 200, description = "Página de tenants")),
    security(("api_jwt" = []))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Query(filter): Query<TenantFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Tenant>>, AppError> {
    Ok(Json(app_state.tenant_service.list(&filter, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/tenants/{id}",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses(
        (status = 200, description = "O tenant", body = Tenant),
        (status = 404, description = "Tenant não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_tenant(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(app_state.tenant_service.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/tenants/{id}",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    request_body = UpdateTenantPayload,
    responses((status = 200, description = "Tenant atualizado", body = Tenant)),
    security(("api_jwt" = []))
)]
pub async fn update_tenant(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(app_state.tenant_service.update(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tenants/{id}",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    request_body = DeleteTenantPayload,
    responses(
        (status = 204, description = "Tenant apagado em cascata"),
        (status = 400, description = "Nome de confirmação não confere")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_tenant(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeleteTenantPayload>,
) -> Result<StatusCode, AppError> {
    app_state.tenant_service.delete(id, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Membros
// ---

#[utoipa::path(
    post,
    path = "/api/tenants/{id}/members",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro adicionado (consome quota)", body = TenantUser),
        (status = 422, description = "Quota de usuários atingida")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeMemberManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<(StatusCode, Json<TenantUser>), AppError> {
    let member = app_state.tenant_service.add_member(id, &payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    get,
    path = "/api/tenants/{id}/members",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant"), ListParams),
    responses((status = 200, description = "Página de membros")),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<TenantUser>>, AppError> {
    Ok(Json(app_state.tenant_service.list_members(id, &params).await?))
}

#[utoipa::path(
    put,
    path = "/api/tenants/{id}/members/{member_id}",
    tag = "Tenancy",
    params(
        ("id" = Uuid, Path, description = "ID do tenant"),
        ("member_id" = Uuid, Path, description = "ID da membership")
    ),
    request_body = UpdateMemberPayload,
    responses(
        (status = 200, description = "Membro atualizado", body = TenantUser),
        (status = 403, description = "O owner não pode ser rebaixado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_member(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeMemberManage>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberPayload>,
) -> Result<Json<TenantUser>, AppError> {
    Ok(Json(
        app_state
            .tenant_service
            .update_member(id, member_id, &payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/tenants/{id}/members/{member_id}",
    tag = "Tenancy",
    params(
        ("id" = Uuid, Path, description = "ID do tenant"),
        ("member_id" = Uuid, Path, description = "ID da membership")
    ),
    responses(
        (status = 204, description = "Membro removido (devolve quota)"),
        (status = 403, description = "O owner não pode ser removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeMemberManage>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    app_state.tenant_service.remove_member(id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Quota
// ---

#[utoipa::path(
    get,
    path = "/api/tenants/{id}/quota",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses((status = 200, description = "A quota do tenant", body = TenantQuota)),
    security(("api_jwt" = []))
)]
pub async fn get_quota(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantQuota>, AppError> {
    Ok(Json(app_state.tenant_service.get_quota(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/tenants/{id}/quota",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    request_body = UpdateQuotaPayload,
    responses((status = 200, description = "Tetos atualizados", body = TenantQuota)),
    security(("api_jwt" = []))
)]
pub async fn update_quota(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeQuotaManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuotaPayload>,
) -> Result<Json<TenantQuota>, AppError> {
    Ok(Json(app_state.tenant_service.update_quota(id, &payload).await?))
}

// Reset manual dos contadores de chamadas (pelo ID da QUOTA, não do tenant)
#[utoipa::path(
    post,
    path = "/api/quotas/{id}/reset-api-calls",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID da quota")),
    responses((status = 200, description = "Contadores zerados", body = TenantQuota)),
    security(("api_jwt" = []))
)]
pub async fn reset_api_calls(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeQuotaManage>,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantQuota>, AppError> {
    Ok(Json(app_state.tenant_service.reset_api_calls(id).await?))
}

// ---
// Settings
// ---

#[utoipa::path(
    get,
    path = "/api/tenants/{id}/settings",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    responses((status = 200, description = "As configurações do tenant", body = TenantSettings)),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeTenantRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantSettings>, AppError> {
    Ok(Json(app_state.tenant_service.get_settings(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/tenants/{id}/settings",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do tenant")),
    request_body = UpdateSettingsPayload,
    responses((status = 200, description = "Configurações atualizadas", body = TenantSettings)),
    security(("api_jwt" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeSettingsManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSettingsPayload>,
) -> Result<Json<TenantSettings>, AppError> {
    Ok(Json(
        app_state.tenant_service.update_settings(id, &payload).await?,
    ))
}
