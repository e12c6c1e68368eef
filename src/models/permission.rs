// src/models/permission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// O que sai do banco (Tabela permissions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,

    // Derivado de service:resource:action na criação; nunca editável
    #[schema(example = "billing:invoice:read")]
    pub code: String,

    #[schema(example = "Ler faturas")]
    pub name: String,
    pub description: Option<String>,

    #[schema(example = "billing")]
    pub service: String,

    #[schema(example = "invoice")]
    pub resource: String,

    #[schema(example = "read")]
    pub action: String,

    pub is_system: bool,
    pub is_tenant_level: bool,

    #[serde(rename = "tenant")]
    pub tenant_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Junta a tripla com ':' — o único jeito de nascer um code.
pub fn derive_code(service: &str, resource: &str, action: &str) -> String {
    format!("{}:{}:{}", service, resource, action)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionPayload {
    #[schema(example = "Ler faturas")]
    pub name: String,
    pub description: Option<String>,

    #[schema(example = "billing")]
    pub service: String,

    #[schema(example = "invoice")]
    pub resource: String,

    #[schema(example = "read")]
    pub action: String,

    #[serde(default)]
    pub is_tenant_level: bool,
    pub tenant: Option<Uuid>,
}

// A tripla e o tenant dono são imutáveis: mudar a tripla = delete + recreate
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionPayload {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct PermissionFilter {
    pub service: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub is_system: Option<bool>,
    pub is_tenant_level: Option<bool>,
    pub tenant_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_e_a_tripla_unida_por_dois_pontos() {
        assert_eq!(derive_code("billing", "invoice", "read"), "billing:invoice:read");
    }
}
