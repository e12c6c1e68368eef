// src/models/api_key.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. ApiKey (Credencial não interativa com escopo próprio)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "api_key_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyType {
    // Representa o próprio tenant (exige tenant_id)
    System,
    // Delegada de um usuário (exige user_id)
    User,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: Uuid,
    pub key_type: ApiKeyType,

    // Parte pública da chave, exibível em listagens
    #[schema(example = "ck_3fa85f64")]
    pub prefix: String,

    // Só o hash é persistido; o segredo em claro existe apenas na resposta
    // de criação e é irrecuperável depois
    #[serde(skip_serializing)]
    pub secret_hash: String,

    pub name: String,
    pub application_name: Option<String>,

    #[serde(rename = "tenant")]
    pub tenant_id: Option<Uuid>,

    #[serde(rename = "user")]
    pub user_id: Option<Uuid>,

    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. O estado efetivo da chave
// ---
// `expired` é um estado implícito e terminal: passa a valer assim que o
// relógio cruza expires_at, bloqueia activate (mas não deactivate, delete
// ou reveal) e só o renew explícito escapa dele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Active,
    Inactive,
    Expired,
}

impl ApiKey {
    pub fn state(&self, now: DateTime<Utc>) -> KeyState {
        if self.is_expired(now) {
            KeyState::Expired
        } else if self.is_active {
            KeyState::Active
        } else {
            KeyState::Inactive
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    /// Uma chave só autentica requisições se estiver ativa E não expirada.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == KeyState::Active
    }
}

// ---
// 3. Escopos da chave (allow-list embutida, apagada junto com a chave)
// ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyScope {
    #[schema(example = "tenant_service")]
    pub service: String,

    #[schema(example = "tenant")]
    pub resource: String,

    #[schema(example = "read")]
    pub action: String,
}

impl KeyScope {
    pub fn matches(&self, service: &str, resource: &str, action: &str) -> bool {
        self.service == service && self.resource == resource && self.action == action
    }
}

// ApiKey + escopos, como o console consome
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyDetail {
    #[serde(flatten)]
    pub api_key: ApiKey,
    pub scopes: Vec<KeyScope>,
}

// Resposta de criação: a ÚNICA vez em que o segredo aparece em claro
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    pub api_key: ApiKeyDetail,

    #[schema(example = "ck_3fa85f64a1b2c3...")]
    pub key: String,
}

// ---
// 4. Payloads
// ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSystemKeyPayload {
    pub name: String,
    pub tenant: Uuid,
    pub application_name: Option<String>,
    pub expires_in_days: Option<i64>,

    #[serde(default)]
    pub scopes: Vec<KeyScope>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserKeyPayload {
    pub name: String,
    pub user: Uuid,
    pub tenant: Option<Uuid>,
    pub expires_in_days: Option<i64>,

    #[serde(default)]
    pub scopes: Vec<KeyScope>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyPayload {
    pub name: Option<String>,
    pub application_name: Option<String>,
    pub is_active: Option<bool>,
    pub tenant: Option<Uuid>,
    pub scopes: Option<Vec<KeyScope>>,
}

// Sair da expiração é uma operação própria (auditável), não um update comum
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewApiKeyPayload {
    pub new_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealHashPayload {
    pub api_key_id: Uuid,
    pub password: String,
}

// O reveal devolve o hash armazenado, nunca o segredo original
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealedHash {
    pub id: Uuid,
    pub name: String,
    pub prefix: String,
    pub key_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ApiKeyFilter {
    pub key_type: Option<ApiKeyType>,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

// ---
// 5. Log de uso e estatísticas
// ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyUsageLog {
    pub id: Uuid,
    pub api_key_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub request_path: String,
    pub request_method: String,
    pub response_status: i32,
    pub client_ip: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// O que o caminho da requisição enfileira para o gravador assíncrono
#[derive(Debug, Clone)]
pub struct UsageEntry {
    pub api_key_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub request_path: String,
    pub request_method: String,
    pub response_status: i32,
    pub client_ip: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStats {
    pub total_keys: i64,
    pub system_keys: i64,
    pub user_keys: i64,
    pub active_keys: i64,
    pub inactive_keys: i64,
    pub expired_keys: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            key_type: ApiKeyType::User,
            prefix: "ck_test".into(),
            secret_hash: "abc".into(),
            name: "test".into(),
            application_name: None,
            tenant_id: None,
            user_id: Some(Uuid::new_v4()),
            is_active,
            expires_at,
            last_used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn estado_segue_o_relogio() {
        let now = Utc::now();

        assert_eq!(key(true, None).state(now), KeyState::Active);
        assert_eq!(key(false, None).state(now), KeyState::Inactive);

        let past = Some(now - Duration::days(1));
        // expirada domina o flag is_active
        assert_eq!(key(true, past).state(now), KeyState::Expired);
        assert_eq!(key(false, past).state(now), KeyState::Expired);

        let future = Some(now + Duration::days(1));
        assert_eq!(key(true, future).state(now), KeyState::Active);
    }

    #[test]
    fn so_chave_ativa_e_nao_expirada_autentica() {
        let now = Utc::now();
        assert!(key(true, None).is_usable(now));
        assert!(!key(false, None).is_usable(now));
        assert!(!key(true, Some(now - Duration::seconds(1))).is_usable(now));
    }

    #[test]
    fn escopo_casa_a_tripla_exata() {
        let s = KeyScope {
            service: "tenant_service".into(),
            resource: "tenant".into(),
            action: "read".into(),
        };
        assert!(s.matches("tenant_service", "tenant", "read"));
        assert!(!s.matches("tenant_service", "tenant", "update"));
        assert!(!s.matches("billing", "tenant", "read"));
    }
}
