// src/services/role_service.rs

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::or_not_found,
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    db::{PermissionRepository, RoleRepository, UserRepository},
    models::auth::User,
    models::role::{CreateRolePayload, Role, RoleDetail, RoleFilter, UpdateRolePayload},
    models::scope::{validate_code, OwnerScope},
};

/// Cargos de sistema são parte do produto: nunca podem ser apagados.
fn ensure_role_deletable(role: &Role) -> Result<(), AppError> {
    if role.is_system {
        return Err(AppError::Forbidden(
            "Cargos de sistema não podem ser apagados.".into(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RoleService {
    role_repo: RoleRepository,
    permission_repo: PermissionRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl RoleService {
    pub fn new(
        role_repo: RoleRepository,
        permission_repo: PermissionRepository,
        user_repo: UserRepository,
        pool: PgPool,
    ) -> Self {
        Self { role_repo, permission_repo, user_repo, pool }
    }

    pub async fn create(&self, payload: &CreateRolePayload) -> Result<Role, AppError> {
        validate_code(&payload.code)?;

        // Diferente do catálogo, is_system aqui é só o flag de proteção:
        // o escopo dono vem apenas do tenant (NULL = cargo global)
        let scope = OwnerScope::from(payload.tenant);

        let mut tx = self.pool.begin().await?;

        if payload.is_default {
            // garante o invariante "um padrão por escopo" na mesma transação
            self.role_repo.clear_default_in_scope(&mut *tx, scope).await?;
        }

        let role = self
            .role_repo
            .create(
                &mut *tx,
                scope,
                &payload.code,
                &payload.name,
                payload.description.as_deref(),
                payload.is_system,
                payload.is_default,
            )
            .await?;

        tx.commit().await?;

        Ok(role)
    }

    pub async fn get(&self, id: Uuid) -> Result<RoleDetail, AppError> {
        let role = or_not_found(self.role_repo.find_by_id(id).await?, "Cargo")?;
        let permissions = self.role_repo.permissions_of(id).await?;
        let users_count = self.role_repo.users_count(id).await?;

        Ok(RoleDetail { role, permissions, users_count })
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateRolePayload) -> Result<Role, AppError> {
        let role = or_not_found(self.role_repo.find_by_id(id).await?, "Cargo")?;

        // is_default passa pelo fluxo transacional próprio
        if let Some(default) = payload.is_default {
            if default {
                self.set_default(id).await?;
            } else {
                self.unset_default(id).await?;
            }
        }

        if payload.name.is_none() && payload.description.is_none() {
            return or_not_found(self.role_repo.find_by_id(id).await?, "Cargo");
        }

        let row = self
            .role_repo
            .update(role.id, payload.name.as_deref(), payload.description.as_deref())
            .await?;
        or_not_found(row, "Cargo")
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let role = or_not_found(self.role_repo.find_by_id(id).await?, "Cargo")?;
        ensure_role_deletable(&role)?;

        self.role_repo.delete(id).await?;
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &RoleFilter,
        params: &ListParams,
    ) -> Result<Paginated<Role>, AppError> {
        let (rows, total) = self.role_repo.list(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    // ---
    // Cargo padrão
    // ---

    /// Marca o cargo como padrão do seu escopo, desmarcando o padrão
    /// anterior na mesma transação (nunca existem dois ao mesmo tempo).
    pub async fn set_default(&self, id: Uuid) -> Result<Role, AppError> {
        let role = or_not_found(self.role_repo.find_by_id(id).await?, "Cargo")?;
        let scope = OwnerScope::from(role.tenant_id);

        let mut tx = self.pool.begin().await?;
        self.role_repo.clear_default_in_scope(&mut *tx, scope).await?;
        let updated = self.role_repo.set_default_flag(&mut *tx, id, true).await?;
        tx.commit().await?;

        or_not_found(updated, "Cargo")
    }

    /// Desmarcar é permitido mesmo que deixe o escopo sem padrão.
    pub async fn unset_default(&self, id: Uuid) -> Result<Role, AppError> {
        let updated = self.role_repo.set_default_flag(&self.pool, id, false).await?;
        or_not_found(updated, "Cargo")
    }

    // ---
    // Lotes de permissões (tudo-ou-nada)
    // ---

    pub async fn assign_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<RoleDetail, AppError> {
        or_not_found(self.role_repo.find_by_id(role_id).await?, "Cargo")?;
        self.ensure_all_permissions_exist(permission_ids).await?;

        let mut tx = self.pool.begin().await?;
        self.role_repo
            .assign_permissions(&mut *tx, role_id, permission_ids)
            .await?;
        tx.commit().await?;

        self.get(role_id).await
    }

    pub async fn remove_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<RoleDetail, AppError> {
        or_not_found(self.role_repo.find_by_id(role_id).await?, "Cargo")?;
        self.ensure_all_permissions_exist(permission_ids).await?;

        let mut tx = self.pool.begin().await?;
        self.role_repo
            .remove_permissions(&mut *tx, role_id, permission_ids)
            .await?;
        tx.commit().await?;

        self.get(role_id).await
    }

    // ---
    // Lotes de usuários (tudo-ou-nada)
    // ---

    pub async fn assign_users(&self, role_id: Uuid, user_ids: &[Uuid]) -> Result<(), AppError> {
        or_not_found(self.role_repo.find_by_id(role_id).await?, "Cargo")?;
        self.ensure_all_users_exist(user_ids).await?;

        let mut tx = self.pool.begin().await?;
        self.role_repo.assign_users(&mut *tx, role_id, user_ids).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn remove_users(&self, role_id: Uuid, user_ids: &[Uuid]) -> Result<(), AppError> {
        or_not_found(self.role_repo.find_by_id(role_id).await?, "Cargo")?;
        self.ensure_all_users_exist(user_ids).await?;

        let mut tx = self.pool.begin().await?;
        self.role_repo.remove_users(&mut *tx, role_id, user_ids).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_users(
        &self,
        role_id: Uuid,
        params: &ListParams,
    ) -> Result<Paginated<User>, AppError> {
        or_not_found(self.role_repo.find_by_id(role_id).await?, "Cargo")?;
        let (rows, total) = self.role_repo.list_users(role_id, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    /// Um id desconhecido no lote falha o lote INTEIRO, antes de tocar
    /// qualquer linha.
    async fn ensure_all_permissions_exist(&self, ids: &[Uuid]) -> Result<(), AppError> {
        if ids.is_empty() {
            return Err(AppError::Validation("O lote de permissões está vazio.".into()));
        }

        let found: HashSet<Uuid> =
            self.permission_repo.find_existing_ids(ids).await?.into_iter().collect();
        let missing: Vec<Uuid> =
            ids.iter().copied().filter(|id| !found.contains(id)).collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "Permissões inexistentes no lote: {:?}",
                missing
            )))
        }
    }

    async fn ensure_all_users_exist(&self, ids: &[Uuid]) -> Result<(), AppError> {
        if ids.is_empty() {
            return Err(AppError::Validation("O lote de usuários está vazio.".into()));
        }

        let found: HashSet<Uuid> =
            self.user_repo.find_existing_ids(ids).await?.into_iter().collect();
        let missing: Vec<Uuid> =
            ids.iter().copied().filter(|id| !found.contains(id)).collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "Usuários inexistentes no lote: {:?}",
                missing
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cargo(is_system: bool) -> Role {
        Role {
            id: Uuid::new_v4(),
            code: "billing_manager".into(),
            name: "Gerente de Faturamento".into(),
            description: None,
            is_system,
            is_default: false,
            tenant_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cargo_de_sistema_nao_pode_ser_apagado() {
        assert!(matches!(
            ensure_role_deletable(&cargo(true)),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_role_deletable(&cargo(false)).is_ok());
    }
}
