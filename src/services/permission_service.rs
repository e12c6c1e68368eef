// src/services/permission_service.rs

use uuid::Uuid;

use crate::{
    common::db_utils::or_not_found,
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    db::{PermissionRepository, ScopeRepository},
    models::permission::{
        derive_code, CreatePermissionPayload, Permission, PermissionFilter,
        UpdatePermissionPayload,
    },
    models::scope::{ImportReport, OwnerScope},
};

// Permissões que todo deploy precisa ter no escopo de sistema.
// Triplas sobre o próprio vocabulário default do catálogo.
const DEFAULT_PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("tenant_service", "tenant", "read", "Ler tenants"),
    ("tenant_service", "tenant", "manage", "Administrar tenants"),
    ("tenant_service", "member", "manage", "Administrar membros"),
    ("tenant_service", "quota", "manage", "Administrar quotas"),
    ("tenant_service", "settings", "manage", "Administrar configurações"),
    ("api_key_service", "api_key", "read", "Ler API Keys"),
    ("api_key_service", "api_key", "manage", "Administrar API Keys"),
    ("rbac_service", "role", "manage", "Administrar cargos"),
    ("rbac_service", "permission", "manage", "Administrar permissões"),
    ("rbac_service", "catalog", "manage", "Administrar o catálogo"),
];

#[derive(Clone)]
pub struct PermissionService {
    permission_repo: PermissionRepository,
    scope_repo: ScopeRepository,
}

impl PermissionService {
    pub fn new(permission_repo: PermissionRepository, scope_repo: ScopeRepository) -> Self {
        Self { permission_repo, scope_repo }
    }

    /// Cria uma permissão. A tripla precisa existir no catálogo: ou no
    /// vocabulário de sistema, ou no vocabulário do próprio tenant dono.
    pub async fn create(&self, payload: &CreatePermissionPayload) -> Result<Permission, AppError> {
        // is_tenant_level <=> pertence a um tenant (invariante estrutural)
        let scope = OwnerScope::from_flags(!payload.is_tenant_level, payload.tenant)?;

        self.validate_triple(scope, &payload.service, &payload.resource, &payload.action)
            .await?;

        let code = derive_code(&payload.service, &payload.resource, &payload.action);

        self.permission_repo
            .create(
                scope,
                &code,
                &payload.name,
                payload.description.as_deref(),
                &payload.service,
                &payload.resource,
                &payload.action,
            )
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Permission, AppError> {
        or_not_found(self.permission_repo.find_by_id(id).await?, "Permissão")
    }

    pub async fn update(
        &self,
        id: Uuid,
        payload: &UpdatePermissionPayload,
    ) -> Result<Permission, AppError> {
        let row = self
            .permission_repo
            .update(id, payload.name.as_deref(), payload.description.as_deref())
            .await?;
        or_not_found(row, "Permissão")
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.permission_repo.delete(id).await? {
            return Err(AppError::NotFound("Permissão não encontrada.".into()));
        }
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &PermissionFilter,
        params: &ListParams,
    ) -> Result<Paginated<Permission>, AppError> {
        let (rows, total) = self.permission_repo.list(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    /// Semeia as permissões de sistema padrão (idempotente, como o
    /// import do catálogo). Pressupõe o catálogo default já importado.
    pub async fn import_defaults(&self) -> Result<ImportReport, AppError> {
        let mut report = ImportReport::default();
        let scope = OwnerScope::System;

        for (service, resource, action, name) in DEFAULT_PERMISSIONS {
            let code = derive_code(service, resource, action);

            if self.permission_repo.find_by_code(scope, &code).await?.is_some() {
                report.existed += 1;
                continue;
            }

            if self.validate_triple(scope, service, resource, action).await.is_err() {
                report.failed += 1;
                continue;
            }

            self.permission_repo
                .create(scope, &code, name, None, service, resource, action)
                .await?;
            report.created += 1;
        }

        tracing::info!(
            "📚 Import das permissões padrão: {} criadas, {} já existiam, {} falharam.",
            report.created,
            report.existed,
            report.failed
        );

        Ok(report)
    }

    /// A tripla só é válida se cada code existir no catálogo visível do
    /// escopo: o vocabulário de sistema sempre vale; o do tenant dono
    /// também, quando houver.
    async fn validate_triple(
        &self,
        scope: OwnerScope,
        service: &str,
        resource: &str,
        action: &str,
    ) -> Result<(), AppError> {
        let service_row = match self
            .scope_repo
            .find_service_by_code(OwnerScope::System, service)
            .await?
        {
            Some(s) => Some(s),
            None if !scope.is_system() => {
                self.scope_repo.find_service_by_code(scope, service).await?
            }
            None => None,
        };

        let Some(service_row) = service_row else {
            return Err(AppError::Validation(format!(
                "Service '{}' não existe no catálogo.",
                service
            )));
        };

        let resource_row = match self
            .scope_repo
            .find_resource_by_code(OwnerScope::System, service_row.id, resource)
            .await?
        {
            Some(r) => Some(r),
            None if !scope.is_system() => {
                self.scope_repo
                    .find_resource_by_code(scope, service_row.id, resource)
                    .await?
            }
            None => None,
        };

        if resource_row.is_none() {
            return Err(AppError::Validation(format!(
                "Resource '{}' não existe no service '{}'.",
                resource, service
            )));
        }

        let action_row = match self
            .scope_repo
            .find_action_by_code(OwnerScope::System, action)
            .await?
        {
            Some(a) => Some(a),
            None if !scope.is_system() => {
                self.scope_repo.find_action_by_code(scope, action).await?
            }
            None => None,
        };

        if action_row.is_none() {
            return Err(AppError::Validation(format!(
                "Action '{}' não existe no catálogo.",
                action
            )));
        }

        Ok(())
    }
}
