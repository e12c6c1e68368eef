// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError, config::AppState, middleware::tenancy::MaybeTenantContext,
    services::authz::Principal,
};

/// 1. O Trait que define a tripla exigida por um endpoint
pub trait ScopeDef: Send + Sync + 'static {
    const SERVICE: &'static str;
    const RESOURCE: &'static str;
    const ACTION: &'static str;
}

/// 2. O Extractor (Guardião): colocar `RequireScope<T>` na assinatura do
/// handler faz a avaliação de autorização rodar antes do corpo dele.
pub struct RequireScope<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireScope<T>
where
    T: ScopeDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        let MaybeTenantContext(tenant_context) =
            MaybeTenantContext::from_request_parts(parts, state).await?;

        app_state
            .authz
            .check(&principal, tenant_context, T::SERVICE, T::RESOURCE, T::ACTION)
            .await?;

        Ok(RequireScope(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS ESCOPOS (TIPOS)
// ---

macro_rules! scope_def {
    ($name:ident, $service:literal, $resource:literal, $action:literal) => {
        pub struct $name;
        impl ScopeDef for $name {
            const SERVICE: &'static str = $service;
            const RESOURCE: &'static str = $resource;
            const ACTION: &'static str = $action;
        }
    };
}

scope_def!(ScopeTenantRead, "tenant_service", "tenant", "read");
scope_def!(ScopeTenantManage, "tenant_service", "tenant", "manage");
scope_def!(ScopeMemberManage, "tenant_service", "member", "manage");
scope_def!(ScopeQuotaManage, "tenant_service", "quota", "manage");
scope_def!(ScopeSettingsManage, "tenant_service", "settings", "manage");
scope_def!(ScopeApiKeyRead, "api_key_service", "api_key", "read");
scope_def!(ScopeApiKeyManage, "api_key_service", "api_key", "manage");
scope_def!(ScopeRoleManage, "rbac_service", "role", "manage");
scope_def!(ScopePermissionManage, "rbac_service", "permission", "manage");
scope_def!(ScopeCatalogManage, "rbac_service", "catalog", "manage");
