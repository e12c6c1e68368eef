// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::api_key::UsageEntry,
    models::auth::User,
    services::authz::Principal,
};

const API_KEY_HEADER: &str = "x-api-key";

// O guardião de autenticação: aceita as duas credenciais do console
// (Bearer JWT de sessão OU X-Api-Key) e insere o Principal resultante
// nos extensions da requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    // 1. Sessão interativa (Authorization: Bearer <jwt>)
    let bearer = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        let user = app_state.auth_service.validate_token(token).await?;
        request.extensions_mut().insert(Principal::User(user));
        return Ok(next.run(request).await);
    }

    // 2. Credencial não interativa (X-Api-Key)
    let api_key_header = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if let Some(presented_key) = api_key_header {
        let (key, scopes) = app_state.api_key_service.authenticate(&presented_key).await?;

        // chave delegada carrega o usuário dono junto
        let user = match key.user_id {
            Some(user_id) => app_state.user_repo.find_by_id(user_id).await?,
            None => None,
        };

        let tenant_id = key.tenant_id;
        let api_key_id = key.id;
        let request_path = request.uri().path().to_owned();
        let request_method = request.method().to_string();
        let request_id = headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        // o teto diário barra a chamada ANTES do handler; a recusa do
        // compare-and-set é a única fonte de verdade
        if let Some(tenant_id) = tenant_id {
            let granted = app_state.tenant_repo.try_record_api_call(tenant_id).await?;
            ensure_daily_call_granted(granted)?;
        }

        request
            .extensions_mut()
            .insert(Principal::ApiKey { key, scopes, user });

        let response = next.run(request).await;

        // o log de uso sai pelo gravador assíncrono, com o status final
        app_state.usage_log.record(UsageEntry {
            api_key_id,
            tenant_id,
            request_path,
            request_method,
            response_status: response.status().as_u16() as i32,
            client_ip: None,
            request_id,
        });

        return Ok(response);
    }

    Err(AppError::InvalidToken)
}

fn ensure_daily_call_granted(granted: bool) -> Result<(), AppError> {
    if granted {
        Ok(())
    } else {
        Err(AppError::QuotaExceeded(
            "O teto diário de chamadas de API do tenant foi atingido.".into(),
        ))
    }
}

// Extrator para handlers que exigem um USUÁRIO por trás da credencial
// (sessão ou chave delegada; chave de sistema é rejeitada).
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .and_then(|p| p.user().cloned())
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                AppError::Authentication(
                    "Esta operação exige um usuário autenticado.".into(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teto_diario_estourado_vira_quota_exceeded() {
        assert!(ensure_daily_call_granted(true).is_ok());
        assert!(matches!(
            ensure_daily_call_granted(false),
            Err(AppError::QuotaExceeded(_))
        ));
    }
}
