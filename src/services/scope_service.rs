// src/services/scope_service.rs

use uuid::Uuid;

use crate::{
    common::db_utils::or_not_found,
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    db::scope_repo::TripleColumn,
    db::ScopeRepository,
    models::scope::{
        validate_code, Action, CreateScopeEntryPayload, ImportReport, OwnerScope, Resource,
        ScopeFilter, Service, UpdateScopeEntryPayload,
    },
};

// Vocabulário default que o botão "importar padrões" do console semeia.
// A operação é idempotente: o que já existe conta como `existed`.
const DEFAULT_SERVICES: &[(&str, &str)] = &[
    ("tenant_service", "Serviço de Tenants"),
    ("auth_service", "Serviço de Autenticação"),
    ("api_key_service", "Serviço de API Keys"),
    ("rbac_service", "Serviço de RBAC"),
];

const DEFAULT_RESOURCES: &[(&str, &str, &str)] = &[
    ("tenant_service", "tenant", "Tenant"),
    ("tenant_service", "member", "Membro"),
    ("tenant_service", "quota", "Quota"),
    ("tenant_service", "settings", "Configurações"),
    ("auth_service", "user", "Usuário"),
    ("api_key_service", "api_key", "API Key"),
    ("rbac_service", "role", "Cargo"),
    ("rbac_service", "permission", "Permissão"),
    ("rbac_service", "catalog", "Catálogo"),
];

const DEFAULT_ACTIONS: &[(&str, &str)] = &[
    ("read", "Leitura"),
    ("list", "Listagem"),
    ("create", "Criação"),
    ("update", "Atualização"),
    ("delete", "Exclusão"),
    ("manage", "Administração"),
];

#[derive(Clone)]
pub struct ScopeService {
    scope_repo: ScopeRepository,
}

impl ScopeService {
    pub fn new(scope_repo: ScopeRepository) -> Self {
        Self { scope_repo }
    }

    // ---
    // Services
    // ---

    pub async fn create_service(
        &self,
        payload: &CreateScopeEntryPayload,
    ) -> Result<Service, AppError> {
        validate_code(&payload.code)?;
        let scope = OwnerScope::from_flags(payload.is_system, payload.tenant)?;

        self.scope_repo
            .create_service(scope, &payload.code, &payload.name, payload.description.as_deref())
            .await
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Service, AppError> {
        or_not_found(self.scope_repo.find_service(id).await?, "Service")
    }

    pub async fn update_service(
        &self,
        id: Uuid,
        payload: &UpdateScopeEntryPayload,
    ) -> Result<Service, AppError> {
        let row = self
            .scope_repo
            .update_service(id, payload.name.as_deref(), payload.description.as_deref())
            .await?;
        or_not_found(row, "Service")
    }

    /// Apagar uma entrada do catálogo ainda referenciada por permissões
    /// deixaria codes pendurados no registro, então bloqueamos com 409.
    pub async fn delete_service(&self, id: Uuid) -> Result<(), AppError> {
        let service = self.get_service(id).await?;
        let scope = OwnerScope::from(service.tenant_id);

        let refs = self
            .scope_repo
            .count_permission_references(TripleColumn::Service, scope, &service.code)
            .await?;
        if refs > 0 {
            return Err(AppError::Conflict(format!(
                "O service '{}' é referenciado por {} permissão(ões) e não pode ser apagado.",
                service.code, refs
            )));
        }

        self.scope_repo.delete_service(id).await?;
        Ok(())
    }

    pub async fn list_services(
        &self,
        filter: &ScopeFilter,
        params: &ListParams,
    ) -> Result<Paginated<Service>, AppError> {
        let (rows, total) = self.scope_repo.list_services(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    // ---
    // Resources
    // ---

    pub async fn create_resource(
        &self,
        payload: &CreateScopeEntryPayload,
    ) -> Result<Resource, AppError> {
        validate_code(&payload.code)?;
        let scope = OwnerScope::from_flags(payload.is_system, payload.tenant)?;

        let service_id = payload.service_id.ok_or_else(|| {
            AppError::Validation("Um resource precisa do service dono (serviceId).".into())
        })?;

        // O service dono precisa existir e estar visível no mesmo escopo
        let service = or_not_found(self.scope_repo.find_service(service_id).await?, "Service")?;
        if !service.is_system && service.tenant_id != scope.tenant_id() {
            return Err(AppError::Validation(
                "O service dono pertence a outro tenant.".into(),
            ));
        }

        self.scope_repo
            .create_resource(
                scope,
                service_id,
                &payload.code,
                &payload.name,
                payload.description.as_deref(),
            )
            .await
    }

    pub async fn get_resource(&self, id: Uuid) -> Result<Resource, AppError> {
        or_not_found(self.scope_repo.find_resource(id).await?, "Resource")
    }

    pub async fn update_resource(
        &self,
        id: Uuid,
        payload: &UpdateScopeEntryPayload,
    ) -> Result<Resource, AppError> {
        let row = self
            .scope_repo
            .update_resource(id, payload.name.as_deref(), payload.description.as_deref())
            .await?;
        or_not_found(row, "Resource")
    }

    pub async fn delete_resource(&self, id: Uuid) -> Result<(), AppError> {
        let resource = self.get_resource(id).await?;
        let scope = OwnerScope::from(resource.tenant_id);

        let refs = self
            .scope_repo
            .count_permission_references(TripleColumn::Resource, scope, &resource.code)
            .await?;
        if refs > 0 {
            return Err(AppError::Conflict(format!(
                "O resource '{}' é referenciado por {} permissão(ões) e não pode ser apagado.",
                resource.code, refs
            )));
        }

        self.scope_repo.delete_resource(id).await?;
        Ok(())
    }

    pub async fn list_resources(
        &self,
        filter: &ScopeFilter,
        params: &ListParams,
    ) -> Result<Paginated<Resource>, AppError> {
        let (rows, total) = self.scope_repo.list_resources(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    // ---
    // Actions
    // ---

    pub async fn create_action(
        &self,
        payload: &CreateScopeEntryPayload,
    ) -> Result<Action, AppError> {
        validate_code(&payload.code)?;
        let scope = OwnerScope::from_flags(payload.is_system, payload.tenant)?;

        self.scope_repo
            .create_action(scope, &payload.code, &payload.name, payload.description.as_deref())
            .await
    }

    pub async fn get_action(&self, id: Uuid) -> Result<Action, AppError> {
        or_not_found(self.scope_repo.find_action(id).await?, "Action")
    }

    pub async fn update_action(
        &self,
        id: Uuid,
        payload: &UpdateScopeEntryPayload,
    ) -> Result<Action, AppError> {
        let row = self
            .scope_repo
            .update_action(id, payload.name.as_deref(), payload.description.as_deref())
            .await?;
        or_not_found(row, "Action")
    }

    pub async fn delete_action(&self, id: Uuid) -> Result<(), AppError> {
        let action = self.get_action(id).await?;
        let scope = OwnerScope::from(action.tenant_id);

        let refs = self
            .scope_repo
            .count_permission_references(TripleColumn::Action, scope, &action.code)
            .await?;
        if refs > 0 {
            return Err(AppError::Conflict(format!(
                "A action '{}' é referenciada por {} permissão(ões) e não pode ser apagada.",
                action.code, refs
            )));
        }

        self.scope_repo.delete_action(id).await?;
        Ok(())
    }

    pub async fn list_actions(
        &self,
        filter: &ScopeFilter,
        params: &ListParams,
    ) -> Result<Paginated<Action>, AppError> {
        let (rows, total) = self.scope_repo.list_actions(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    // ---
    // Import de defaults
    // ---

    /// Semeia o vocabulário padrão no escopo de sistema. Idempotente:
    /// pode ser chamado quantas vezes quiser, cada entrada já presente
    /// só incrementa `existed`.
    pub async fn import_defaults(&self) -> Result<ImportReport, AppError> {
        let mut report = ImportReport::default();
        let scope = OwnerScope::System;

        for (code, name) in DEFAULT_SERVICES {
            match self.scope_repo.find_service_by_code(scope, code).await? {
                Some(_) => report.existed += 1,
                None => {
                    self.scope_repo.create_service(scope, code, name, None).await?;
                    report.created += 1;
                }
            }
        }

        for (service_code, code, name) in DEFAULT_RESOURCES {
            let Some(service) = self.scope_repo.find_service_by_code(scope, service_code).await?
            else {
                report.failed += 1;
                continue;
            };

            match self
                .scope_repo
                .find_resource_by_code(scope, service.id, code)
                .await?
            {
                Some(_) => report.existed += 1,
                None => {
                    self.scope_repo
                        .create_resource(scope, service.id, code, name, None)
                        .await?;
                    report.created += 1;
                }
            }
        }

        for (code, name) in DEFAULT_ACTIONS {
            match self.scope_repo.find_action_by_code(scope, code).await? {
                Some(_) => report.existed += 1,
                None => {
                    self.scope_repo.create_action(scope, code, name, None).await?;
                    report.created += 1;
                }
            }
        }

        tracing::info!(
            "📚 Import do catálogo padrão: {} criados, {} já existiam, {} falharam.",
            report.created,
            report.existed,
            report.failed
        );

        Ok(report)
    }
}
