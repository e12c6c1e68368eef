// src/models/role.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::permission::Permission;

// O que sai do banco (Tabela roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,

    // Imutável e único dentro do escopo dono
    #[schema(example = "billing_manager")]
    pub code: String,

    #[schema(example = "Gerente de Faturamento")]
    pub name: String,
    pub description: Option<String>,

    // Cargos de sistema não podem ser apagados
    pub is_system: bool,

    // No máximo um cargo padrão por escopo (decisão registrada no DESIGN.md)
    pub is_default: bool,

    // NULL = cargo global, visível em todos os tenants
    #[serde(rename = "tenant")]
    pub tenant_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Cargo + permissões + contagem de usuários (tela de detalhe do console)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub users_count: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[schema(example = "Gerente de Faturamento")]
    pub name: String,

    #[schema(example = "billing_manager")]
    pub code: String,
    pub description: Option<String>,

    #[serde(default)]
    pub is_system: bool,

    #[serde(default)]
    pub is_default: bool,
    pub tenant: Option<Uuid>,
}

// code e tenant são imutáveis pós-criação
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct RoleFilter {
    pub is_system: Option<bool>,
    pub is_default: Option<bool>,
    pub tenant_id: Option<Uuid>,
    // true = só cargos globais (tenant_id IS NULL)
    pub is_global: Option<bool>,
}

// Lote de permissões para assign/remove (tudo-ou-nada)
#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionBatchPayload {
    pub permission_ids: Vec<Uuid>,
}

// Lote de usuários para assign/remove (tudo-ou-nada)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserBatchPayload {
    pub user_ids: Vec<Uuid>,
}
