// src/services/tenancy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::or_not_found,
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    db::tenancy_repo::QuotaCounter,
    db::TenantRepository,
    models::tenancy::{
        validate_dns_label, AddMemberPayload, CreateTenantPayload, DeleteTenantPayload,
        MemberRole, Tenant, TenantFilter, TenantQuota, TenantSettings, TenantUser,
        UpdateMemberPayload, UpdateQuotaPayload, UpdateSettingsPayload, UpdateTenantPayload,
    },
};

// o owner não é rebaixável nem removível pelo CRUD de membros; a
// transferência de posse é uma operação à parte
fn ensure_member_role_changeable(member: &TenantUser) -> Result<(), AppError> {
    if member.role == MemberRole::Owner {
        return Err(AppError::Forbidden(
            "O papel do owner do tenant não pode ser alterado.".into(),
        ));
    }
    Ok(())
}

fn ensure_member_removable(member: &TenantUser) -> Result<(), AppError> {
    if member.role == MemberRole::Owner {
        return Err(AppError::Forbidden(
            "O owner do tenant não pode ser removido.".into(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    pool: PgPool,
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, pool: PgPool) -> Self {
        Self { tenant_repo, pool }
    }

    /// Cria o tenant e, atomicamente, a quota com os defaults, as
    /// configurações iniciais e (se houver dono) a membership de owner.
    /// Se qualquer passo falhar, nada fica pela metade.
    pub async fn create_tenant(&self, payload: &CreateTenantPayload) -> Result<Tenant, AppError> {
        validate_dns_label(&payload.slug, false)?;
        validate_dns_label(&payload.subdomain, true)?;

        let mut tx = self.pool.begin().await?;

        let tenant = self.tenant_repo.create_tenant(&mut *tx, payload).await?;

        self.tenant_repo.create_quota(&mut *tx, tenant.id).await?;
        self.tenant_repo.create_settings(&mut *tx, tenant.id).await?;

        if let Some(owner_id) = payload.owner_user_id {
            self.tenant_repo
                .add_member(&mut *tx, tenant.id, owner_id, MemberRole::Owner, true)
                .await?;

            // o dono ocupa o primeiro slot de usuário
            let granted = self
                .tenant_repo
                .try_increment(&mut *tx, tenant.id, QuotaCounter::Users)
                .await?;
            if !granted {
                return Err(AppError::QuotaExceeded(
                    "A quota de usuários do tenant já nasceu esgotada.".into(),
                ));
            }
        }

        tx.commit().await?;

        tracing::info!("🏢 Tenant {} ({}) criado.", tenant.name, tenant.id);

        Ok(tenant)
    }

    pub async fn get(&self, id: Uuid) -> Result<Tenant, AppError> {
        or_not_found(self.tenant_repo.find_by_id(id).await?, "Tenant")
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateTenantPayload) -> Result<Tenant, AppError> {
        let row = self.tenant_repo.update_tenant(id, payload).await?;
        or_not_found(row, "Tenant")
    }

    /// Deleção irreversível: cascateia memberships, quota, settings,
    /// API Keys e todo o RBAC do tenant. Por isso exigimos o nome exato
    /// digitado como confirmação.
    pub async fn delete(&self, id: Uuid, payload: &DeleteTenantPayload) -> Result<(), AppError> {
        let tenant = self.get(id).await?;

        if payload.confirm_name != tenant.name {
            return Err(AppError::Validation(
                "O nome de confirmação não confere com o nome do tenant.".into(),
            ));
        }

        self.tenant_repo.delete_tenant(&self.pool, id).await?;

        tracing::warn!("🗑️ Tenant {} ({}) apagado em cascata.", tenant.name, tenant.id);

        Ok(())
    }

    pub async fn list(
        &self,
        filter: &TenantFilter,
        params: &ListParams,
    ) -> Result<Paginated<Tenant>, AppError> {
        let (rows, total) = self.tenant_repo.list(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    // ---
    // Membros
    // ---

    /// Adiciona um membro consumindo um slot da quota de usuários na
    /// mesma transação: ou entra membro E contador, ou nada.
    pub async fn add_member(
        &self,
        tenant_id: Uuid,
        payload: &AddMemberPayload,
    ) -> Result<TenantUser, AppError> {
        self.get(tenant_id).await?;

        let mut tx = self.pool.begin().await?;

        let granted = self
            .tenant_repo
            .try_increment(&mut *tx, tenant_id, QuotaCounter::Users)
            .await?;
        if !granted {
            return Err(AppError::QuotaExceeded(
                "A quota de usuários do tenant foi atingida.".into(),
            ));
        }

        let member = self
            .tenant_repo
            .add_member(
                &mut *tx,
                tenant_id,
                payload.user_id,
                payload.role.into(),
                payload.is_active,
            )
            .await?;

        tx.commit().await?;

        Ok(member)
    }

    pub async fn update_member(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
        payload: &UpdateMemberPayload,
    ) -> Result<TenantUser, AppError> {
        let member = self.member_of_tenant(tenant_id, member_id).await?;

        if payload.role.is_some() {
            ensure_member_role_changeable(&member)?;
        }

        let row = self
            .tenant_repo
            .update_member(member_id, payload.role.map(Into::into), payload.is_active)
            .await?;
        or_not_found(row, "Membro")
    }

    /// Remove o membro e devolve o slot de quota na mesma transação.
    pub async fn remove_member(&self, tenant_id: Uuid, member_id: Uuid) -> Result<(), AppError> {
        let member = self.member_of_tenant(tenant_id, member_id).await?;
        ensure_member_removable(&member)?;

        let mut tx = self.pool.begin().await?;
        self.tenant_repo.delete_member(&mut *tx, member_id).await?;
        self.tenant_repo
            .release(&mut *tx, tenant_id, QuotaCounter::Users)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_members(
        &self,
        tenant_id: Uuid,
        params: &ListParams,
    ) -> Result<Paginated<TenantUser>, AppError> {
        self.get(tenant_id).await?;
        let (rows, total) = self.tenant_repo.list_members(tenant_id, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    // ---
    // Quota
    // ---

    pub async fn get_quota(&self, tenant_id: Uuid) -> Result<TenantQuota, AppError> {
        let quota = or_not_found(self.tenant_repo.get_quota(tenant_id).await?, "Quota")?;

        // Leitura corrige uma virada diária que o job ainda não aplicou
        let today = chrono::Utc::now().date_naive();
        if quota.needs_daily_reset(today) {
            self.tenant_repo.apply_daily_rollover(today).await?;
            return or_not_found(self.tenant_repo.get_quota(tenant_id).await?, "Quota");
        }

        Ok(quota)
    }

    /// Só os tetos max_* são editáveis; os contadores current_* pertencem
    /// ao sistema.
    pub async fn update_quota(
        &self,
        tenant_id: Uuid,
        payload: &UpdateQuotaPayload,
    ) -> Result<TenantQuota, AppError> {
        let row = self.tenant_repo.update_quota_limits(tenant_id, payload).await?;
        or_not_found(row, "Quota")
    }

    pub async fn reset_api_calls(&self, quota_id: Uuid) -> Result<TenantQuota, AppError> {
        let row = self.tenant_repo.reset_api_calls(quota_id).await?;
        or_not_found(row, "Quota")
    }

    // ---
    // Settings
    // ---

    pub async fn get_settings(&self, tenant_id: Uuid) -> Result<TenantSettings, AppError> {
        or_not_found(self.tenant_repo.get_settings(tenant_id).await?, "Configurações")
    }

    pub async fn update_settings(
        &self,
        tenant_id: Uuid,
        payload: &UpdateSettingsPayload,
    ) -> Result<TenantSettings, AppError> {
        let row = self
            .tenant_repo
            .update_settings(
                tenant_id,
                payload.timezone.as_deref(),
                payload.language.as_deref(),
                payload.theme.as_deref(),
                payload.password_policy.as_ref(),
                payload.notification_settings.as_ref(),
            )
            .await?;
        or_not_found(row, "Configurações")
    }

    /// Membership válida para o tenant do caminho; membro de outro tenant
    /// é indistinguível de inexistente (404, não 403).
    async fn member_of_tenant(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
    ) -> Result<TenantUser, AppError> {
        let member = or_not_found(self.tenant_repo.find_member(member_id).await?, "Membro")?;
        if member.tenant_id != tenant_id {
            return Err(AppError::NotFound("Membro não encontrado.".into()));
        }
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn membro(role: MemberRole) -> TenantUser {
        TenantUser {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_nao_pode_ser_rebaixado_nem_removido() {
        let owner = membro(MemberRole::Owner);
        assert!(matches!(
            ensure_member_role_changeable(&owner),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_member_removable(&owner),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_e_member_sao_administraveis() {
        for role in [MemberRole::Admin, MemberRole::Member] {
            let m = membro(role);
            assert!(ensure_member_role_changeable(&m).is_ok());
            assert!(ensure_member_removable(&m).is_ok());
        }
    }
}
