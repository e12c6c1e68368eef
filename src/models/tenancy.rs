// src/models/tenancy.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// ---
// 1. Tenant (A organização-cliente, partição de topo de quase tudo)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tenant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,

    #[schema(example = "Acme")]
    pub name: String,

    // slug e subdomain são fixados na criação e nunca mudam
    #[schema(example = "acme")]
    pub slug: String,

    #[schema(example = "acme.example.com")]
    pub subdomain: String,

    #[schema(example = "admin@acme.com")]
    pub contact_email: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,

    // Desativação é via status; deleção é operação explícita e irreversível
    pub status: TenantStatus,
    pub owner_user_id: Option<Uuid>,

    #[schema(example = "#1677ff")]
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, message = "O nome do tenant é obrigatório."))]
    pub name: String,

    #[schema(example = "acme")]
    pub slug: String,

    #[schema(example = "acme.example.com")]
    pub subdomain: String,

    #[validate(email(message = "O e-mail de contato é inválido."))]
    pub contact_email: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub owner_user_id: Option<Uuid>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

// Apenas os campos mutáveis; slug/subdomain ficam de fora de propósito
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub status: Option<TenantStatus>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

// Deleção cascateia tudo: exigimos o nome exato digitado como confirmação
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTenantPayload {
    #[schema(example = "Acme")]
    pub confirm_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
}

// ---
// 2. TenantUser (O vínculo Usuário <-> Tenant, com papel local)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,

    // owner é protegido: não pode ser removido nem rebaixado
    pub role: MemberRole,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// owner fica de fora: só nasce na criação do tenant ou por transferência
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    pub user_id: Uuid,
    pub role: AssignableRole,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// O subconjunto de papéis que um membro comum pode receber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssignableRole {
    Admin,
    Member,
}

impl From<AssignableRole> for MemberRole {
    fn from(r: AssignableRole) -> Self {
        match r {
            AssignableRole::Admin => MemberRole::Admin,
            AssignableRole::Member => MemberRole::Member,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPayload {
    pub role: Option<AssignableRole>,
    pub is_active: Option<bool>,
}

// ---
// 3. TenantQuota (Tetos e contadores, 1:1 com o Tenant)
// ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuota {
    pub id: Uuid,
    pub tenant_id: Uuid,

    pub max_users: i32,
    pub current_users: i32,
    pub max_storage_gb: i32,
    pub current_storage_gb: i32,
    pub max_api_keys: i32,
    pub current_api_keys: i32,
    pub max_api_requests_per_day: i32,

    // Zerado na virada do dia (e manualmente via reset explícito)
    pub current_api_calls_today: i32,

    // Acumulativo, sem teto
    pub current_api_calls_this_month: i64,

    pub max_notifications_per_day: i32,
    pub current_notifications_today: i32,
    pub max_log_retention_days: i32,

    // Última virada diária aplicada; o job só zera se um novo dia começou
    #[schema(ignore)]
    pub last_daily_reset: NaiveDate,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantQuota {
    /// A regra da virada diária: "zera se um novo dia começou desde o
    /// último reset". Idempotente por construção, então uma execução
    /// perdida do job se corrige sozinha na próxima checagem.
    pub fn needs_daily_reset(&self, today: NaiveDate) -> bool {
        self.last_daily_reset < today
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuotaPayload {
    pub max_users: Option<i32>,
    pub max_storage_gb: Option<i32>,
    pub max_api_keys: Option<i32>,
    pub max_api_requests_per_day: Option<i32>,
    pub max_notifications_per_day: Option<i32>,
    pub max_log_retention_days: Option<i32>,
}

// ---
// 4. TenantSettings (Preferências, 1:1 com o Tenant)
// ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordPolicy {
    pub min_length: u8,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special_char: bool,

    // 0 = senhas nunca expiram
    pub password_expiry_days: u16,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
            require_special_char: false,
            password_expiry_days: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub system_notifications: bool,
    pub marketing_emails: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            system_notifications: true,
            marketing_emails: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    pub id: Uuid,
    pub tenant_id: Uuid,

    #[schema(example = "America/Sao_Paulo")]
    pub timezone: String,

    #[schema(example = "pt-BR")]
    pub language: String,

    #[schema(example = "light")]
    pub theme: String,

    #[schema(value_type = PasswordPolicy)]
    pub password_policy: Json<PasswordPolicy>,

    #[schema(value_type = NotificationSettings)]
    pub notification_settings: Json<NotificationSettings>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsPayload {
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub password_policy: Option<PasswordPolicy>,
    pub notification_settings: Option<NotificationSettings>,
}

/// Valida slug/subdomain contra um padrão estilo DNS label:
/// minúsculas e dígitos separados por hífens (e pontos, no subdomain).
pub fn validate_dns_label(value: &str, allow_dots: bool) -> Result<(), AppError> {
    let valid = !value.is_empty()
        && value.len() <= 253
        && !value.starts_with(['-', '.'])
        && !value.ends_with(['-', '.'])
        && value.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || (allow_dots && c == '.')
        })
        && !value.contains("..");

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Valor '{}' inválido: use letras minúsculas, dígitos e hífens.",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(last_reset: NaiveDate) -> TenantQuota {
        TenantQuota {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            max_users: 10,
            current_users: 0,
            max_storage_gb: 10,
            current_storage_gb: 0,
            max_api_keys: 5,
            current_api_keys: 0,
            max_api_requests_per_day: 1000,
            current_api_calls_today: 42,
            current_api_calls_this_month: 420,
            max_notifications_per_day: 100,
            current_notifications_today: 7,
            max_log_retention_days: 30,
            last_daily_reset: last_reset,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn virada_diaria_so_quando_muda_o_dia() {
        let d1 = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        assert!(quota(d1).needs_daily_reset(d2));
        // idempotente: rodar de novo no mesmo dia não re-zera
        assert!(!quota(d2).needs_daily_reset(d2));
        // relógio atrasado nunca dispara reset
        assert!(!quota(d2).needs_daily_reset(d1));
    }

    #[test]
    fn slug_estilo_dns() {
        assert!(validate_dns_label("acme", false).is_ok());
        assert!(validate_dns_label("acme-corp-2", false).is_ok());
        assert!(validate_dns_label("Acme", false).is_err());
        assert!(validate_dns_label("-acme", false).is_err());
        assert!(validate_dns_label("acme-", false).is_err());
        assert!(validate_dns_label("", false).is_err());
        assert!(validate_dns_label("acme.example.com", false).is_err());
    }

    #[test]
    fn subdomain_aceita_pontos() {
        assert!(validate_dns_label("acme.example.com", true).is_ok());
        assert!(validate_dns_label("acme..example", true).is_err());
        assert!(validate_dns_label(".acme", true).is_err());
    }

    #[test]
    fn papel_atribuivel_nunca_e_owner() {
        assert_eq!(MemberRole::from(AssignableRole::Admin), MemberRole::Admin);
        assert_eq!(MemberRole::from(AssignableRole::Member), MemberRole::Member);
    }
}
