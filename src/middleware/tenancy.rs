// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

fn parse_tenant_header(parts: &Parts) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(TENANT_ID_HEADER) else {
        return Ok(None);
    };

    let value_str = value.to_str().map_err(|_| {
        AppError::Validation("Cabeçalho X-Tenant-ID contém caracteres inválidos.".into())
    })?;

    let tenant_id = Uuid::parse_str(value_str).map_err(|_| {
        AppError::Validation("Cabeçalho X-Tenant-ID inválido (não é um UUID).".into())
    })?;

    Ok(Some(tenant_id))
}

// O tenant que a requisição quer acessar, vindo do X-Tenant-ID.
// Opcional: rotas funcionam com ou sem contexto de tenant (a avaliação
// de autorização muda conforme a presença).
#[derive(Debug, Clone, Copy)]
pub struct MaybeTenantContext(pub Option<Uuid>);

impl<S> FromRequestParts<S> for MaybeTenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeTenantContext(parse_tenant_header(parts)?))
    }
}
