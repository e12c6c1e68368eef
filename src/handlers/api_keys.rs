// src/handlers/api_keys.rs

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
    middleware::auth::AuthenticatedUser,
    middleware::rbac::{RequireScope, ScopeApiKeyManage, ScopeApiKeyRead},
    models::api_key::{
        ApiKey, ApiKeyDetail, ApiKeyFilter, ApiKeyStats, ApiKeyUsageLog, CreateSystemKeyPayload,
        CreateUserKeyPayload, CreatedApiKey, RenewApiKeyPayload, RevealHashPayload,
        RevealedHash, UpdateApiKeyPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/api-keys/system",
    tag = "API Keys",
    request_body = CreateSystemKeyPayload,
    responses(
        (status = 201, description = "Chave criada; o segredo só aparece AQUI", body = CreatedApiKey),
        (status = 422, description = "Quota de chaves do tenant atingida")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_system_key(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Json(payload): Json<CreateSystemKeyPayload>,
) -> Result<(StatusCode, Json<CreatedApiKey>), AppError> {
    let created = app_state.api_key_service.create_system_key(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/api-keys/user",
    tag = "API Keys",
    request_body = CreateUserKeyPayload,
    responses(
        (status = 201, description = "Chave delegada criada", body = CreatedApiKey)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user_key(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Json(payload): Json<CreateUserKeyPayload>,
) -> Result<(StatusCode, Json<CreatedApiKey>), AppError> {
    let created = app_state.api_key_service.create_user_key(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/api-keys",
    tag = "API Keys",
    params(ApiKeyFilter, ListParams),
    responses((status = 200, description = "Página de chaves (sem segredos)")),
    security(("api_jwt" = []))
)]
pub async fn list_api_keys(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyRead>,
    Query(filter): Query<ApiKeyFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<ApiKey>>, AppError> {
    Ok(Json(app_state.api_key_service.list(&filter, &params).await?))
}

// A rota fixa /stats precisa vir antes de /{id} no router
#[utoipa::path(
    get,
    path = "/api/api-keys/stats",
    tag = "API Keys",
    responses((status = 200, description = "Contagens por tipo e estado", body = ApiKeyStats)),
    security(("api_jwt" = []))
)]
pub async fn stats(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyRead>,
    Query(filter): Query<ApiKeyFilter>,
) -> Result<Json<ApiKeyStats>, AppError> {
    Ok(Json(app_state.api_key_service.stats(filter.tenant_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/api-keys/{id}",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave")),
    responses((status = 200, description = "Chave + escopos", body = ApiKeyDetail)),
    security(("api_jwt" = []))
)]
pub async fn get_api_key(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiKeyDetail>, AppError> {
    Ok(Json(app_state.api_key_service.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/api-keys/{id}",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave")),
    request_body = UpdateApiKeyPayload,
    responses((status = 200, description = "Chave atualizada", body = ApiKeyDetail)),
    security(("api_jwt" = []))
)]
pub async fn update_api_key(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateApiKeyPayload>,
) -> Result<Json<ApiKeyDetail>, AppError> {
    Ok(Json(app_state.api_key_service.update(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/api-keys/{id}",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave")),
    responses((status = 204, description = "Chave apagada (devolve quota)")),
    security(("api_jwt" = []))
)]
pub async fn delete_api_key(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.api_key_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/api-keys/{id}/activate",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave")),
    responses(
        (status = 200, description = "Chave ativada", body = ApiKey),
        (status = 400, description = "Chave expirada não pode ser ativada")
    ),
    security(("api_jwt" = []))
)]
pub async fn activate(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiKey>, AppError> {
    Ok(Json(app_state.api_key_service.activate(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/api-keys/{id}/deactivate",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave")),
    responses((status = 200, description = "Chave desativada", body = ApiKey)),
    security(("api_jwt" = []))
)]
pub async fn deactivate(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiKey>, AppError> {
    Ok(Json(app_state.api_key_service.deactivate(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/api-keys/{id}/renew",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave")),
    request_body = RenewApiKeyPayload,
    responses((status = 200, description = "A única saída do estado expirado", body = ApiKey)),
    security(("api_jwt" = []))
)]
pub async fn renew(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenewApiKeyPayload>,
) -> Result<Json<ApiKey>, AppError> {
    Ok(Json(app_state.api_key_service.renew(id, &payload).await?))
}

// Reveal exige a SENHA do usuário logado de novo, e devolve o hash
// armazenado — o segredo original é irrecuperável.
#[utoipa::path(
    post,
    path = "/api/api-keys/reveal-hash",
    tag = "API Keys",
    request_body = RevealHashPayload,
    responses(
        (status = 200, description = "O hash armazenado", body = RevealedHash),
        (status = 401, description = "Senha incorreta")
    ),
    security(("api_jwt" = []))
)]
pub async fn reveal_hash(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyManage>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<RevealHashPayload>,
) -> Result<Json<RevealedHash>, AppError> {
    Ok(Json(app_state.api_key_service.reveal_hash(&user, &payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/api-keys/{id}/usage-logs",
    tag = "API Keys",
    params(("id" = Uuid, Path, description = "ID da chave"), ListParams),
    responses((status = 200, description = "Página de logs de uso")),
    security(("api_jwt" = []))
)]
pub async fn usage_logs(
    State(app_state): State<AppState>,
    _guard: RequireScope<ScopeApiKeyRead>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<ApiKeyUsageLog>>, AppError> {
    Ok(Json(app_state.api_key_service.usage_logs(id, &params).await?))
}
