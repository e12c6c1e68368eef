// src/models/scope.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// 1. OwnerScope (O "Dono" de uma entidade do catálogo)
// ---
// Toda entidade do catálogo (e também Permissões e Cargos) pertence ou ao
// sistema (escopo global) ou a um tenant específico. Representamos isso como
// uma união etiquetada em vez do par booleano + campo anulável: a combinação
// inconsistente (is_system=true com tenant) nem sequer é representável.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    System,
    Tenant(Uuid),
}

impl OwnerScope {
    /// Monta o escopo a partir do par (is_system, tenant) vindo do payload,
    /// rejeitando as duas combinações inválidas.
    pub fn from_flags(is_system: bool, tenant_id: Option<Uuid>) -> Result<Self, AppError> {
        match (is_system, tenant_id) {
            (true, None) => Ok(OwnerScope::System),
            (false, Some(id)) => Ok(OwnerScope::Tenant(id)),
            (true, Some(_)) => Err(AppError::Validation(
                "Entidade de sistema não pode pertencer a um tenant.".into(),
            )),
            (false, None) => Err(AppError::Validation(
                "Entidade que não é de sistema precisa de um tenant dono.".into(),
            )),
        }
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            OwnerScope::System => None,
            OwnerScope::Tenant(id) => Some(*id),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, OwnerScope::System)
    }
}

impl From<Option<Uuid>> for OwnerScope {
    // No banco o escopo é a coluna anulável tenant_id
    fn from(tenant_id: Option<Uuid>) -> Self {
        match tenant_id {
            None => OwnerScope::System,
            Some(id) => OwnerScope::Tenant(id),
        }
    }
}

// ---
// 2. Validação de código do catálogo
// ---
/// Códigos do catálogo seguem `^[a-z][a-z0-9_]*$` e são imutáveis
/// após a criação.
pub fn validate_code(code: &str) -> Result<(), AppError> {
    let mut chars = code.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Código '{}' inválido: use snake_case minúsculo começando por letra.",
            code
        )))
    }
}

// ---
// 3. As entidades do catálogo (Service / Resource / Action)
// ---

// O que sai do banco (Tabela services)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,

    #[schema(example = "tenant_service")]
    pub code: String,

    #[schema(example = "Serviço de Tenants")]
    pub name: String,
    pub description: Option<String>,

    #[schema(ignore)]
    pub tenant_id: Option<Uuid>,
    pub is_system: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela resources) — um Resource pertence a um Service
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub service_id: Uuid,

    #[schema(example = "tenant")]
    pub code: String,

    #[schema(example = "Tenant")]
    pub name: String,
    pub description: Option<String>,

    #[schema(ignore)]
    pub tenant_id: Option<Uuid>,
    pub is_system: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (Tabela actions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: Uuid,

    #[schema(example = "read")]
    pub code: String,

    #[schema(example = "Leitura")]
    pub name: String,
    pub description: Option<String>,

    #[schema(ignore)]
    pub tenant_id: Option<Uuid>,
    pub is_system: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 4. Payloads
// ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateScopeEntryPayload {
    #[schema(example = "billing")]
    pub code: String,

    #[schema(example = "Faturamento")]
    pub name: String,
    pub description: Option<String>,

    // Um Resource precisa apontar para o Service dono (ignorado nos demais)
    pub service_id: Option<Uuid>,

    #[serde(default)]
    pub is_system: bool,
    pub tenant: Option<Uuid>,
}

// code é imutável: só nome/descrição podem mudar
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScopeEntryPayload {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ScopeFilter {
    pub tenant_id: Option<Uuid>,
    pub is_system: Option<bool>,
    pub service_id: Option<Uuid>,
}

// Resultado do import idempotente de defaults
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub created: u32,
    pub existed: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_scope_rejeita_combinacoes_invalidas() {
        assert!(OwnerScope::from_flags(true, None).is_ok());
        assert!(OwnerScope::from_flags(false, Some(Uuid::new_v4())).is_ok());
        assert!(OwnerScope::from_flags(true, Some(Uuid::new_v4())).is_err());
        assert!(OwnerScope::from_flags(false, None).is_err());
    }

    #[test]
    fn owner_scope_derivado_da_coluna() {
        assert!(OwnerScope::from(None).is_system());
        let id = Uuid::new_v4();
        assert_eq!(OwnerScope::from(Some(id)).tenant_id(), Some(id));
    }

    #[test]
    fn codigos_validos() {
        for code in ["read", "tenant_service", "a1", "log_retention_days"] {
            assert!(validate_code(code).is_ok(), "{code}");
        }
    }

    #[test]
    fn codigos_invalidos() {
        for code in ["", "Read", "1read", "_read", "re-ad", "re ad", "ação"] {
            assert!(validate_code(code).is_err(), "{code}");
        }
    }
}
