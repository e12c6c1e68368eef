// src/db/tenancy_repo.rs

use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::db_utils::map_unique_violation;
use crate::common::error::AppError;
use crate::common::pagination::ListParams;
use crate::models::tenancy::{
    CreateTenantPayload, MemberRole, NotificationSettings, PasswordPolicy, Tenant, TenantFilter,
    TenantQuota, TenantSettings, TenantUser, UpdateQuotaPayload, UpdateTenantPayload,
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

// Qual contador com teto está sendo movimentado
#[derive(Debug, Clone, Copy)]
pub enum QuotaCounter {
    Users,
    ApiKeys,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Tenants
    // ---

    pub async fn create_tenant<'e, E>(
        &self,
        executor: E,
        payload: &CreateTenantPayload,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants
                (name, slug, subdomain, contact_email, description, logo_url,
                 owner_user_id, primary_color, secondary_color)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.slug)
        .bind(&payload.subdomain)
        .bind(&payload.contact_email)
        .bind(&payload.description)
        .bind(&payload.logo_url)
        .bind(payload.owner_user_id)
        .bind(&payload.primary_color)
        .bind(&payload.secondary_color)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Já existe um tenant com esse slug ou subdomain."))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_tenant(
        &self,
        id: Uuid,
        payload: &UpdateTenantPayload,
    ) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                logo_url = COALESCE($4, logo_url),
                status = COALESCE($5, status),
                primary_color = COALESCE($6, primary_color),
                secondary_color = COALESCE($7, secondary_color),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.logo_url)
        .bind(payload.status)
        .bind(&payload.primary_color)
        .bind(&payload.secondary_color)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// A deleção é um único DELETE: memberships, quota, settings e todos
    /// os registros de catálogo/permissão/cargo do tenant caem junto via
    /// ON DELETE CASCADE, atomicamente.
    pub async fn delete_tenant<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        filter: &TenantFilter,
        params: &ListParams,
    ) -> Result<(Vec<Tenant>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT * FROM tenants
            WHERE ($1::tenant_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR slug ILIKE $2 OR subdomain ILIKE $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.status)
        .bind(&search)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tenants
            WHERE ($1::tenant_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR slug ILIKE $2 OR subdomain ILIKE $2)
            "#,
        )
        .bind(filter.status)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---
    // Membros
    // ---

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
        is_active: bool,
    ) -> Result<TenantUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TenantUser>(
            r#"
            INSERT INTO tenant_users (tenant_id, user_id, role, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role)
        .bind(is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Este usuário já é membro do tenant."))
    }

    pub async fn find_member(&self, id: Uuid) -> Result<Option<TenantUser>, AppError> {
        let row = sqlx::query_as::<_, TenantUser>("SELECT * FROM tenant_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_member(
        &self,
        id: Uuid,
        role: Option<MemberRole>,
        is_active: Option<bool>,
    ) -> Result<Option<TenantUser>, AppError> {
        let row = sqlx::query_as::<_, TenantUser>(
            r#"
            UPDATE tenant_users
            SET role = COALESCE($2::member_role, role),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(role)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_member<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tenant_users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_members(
        &self,
        tenant_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<TenantUser>, i64), AppError> {
        let rows = sqlx::query_as::<_, TenantUser>(
            r#"
            SELECT * FROM tenant_users
            WHERE tenant_id = $1
            ORDER BY created_at
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tenant_users WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    // ---
    // Quota
    // ---

    pub async fn create_quota<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<TenantQuota, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, TenantQuota>(
            "INSERT INTO tenant_quotas (tenant_id) VALUES ($1) RETURNING *",
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn get_quota(&self, tenant_id: Uuid) -> Result<Option<TenantQuota>, AppError> {
        let row =
            sqlx::query_as::<_, TenantQuota>("SELECT * FROM tenant_quotas WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    pub async fn update_quota_limits(
        &self,
        tenant_id: Uuid,
        payload: &UpdateQuotaPayload,
    ) -> Result<Option<TenantQuota>, AppError> {
        let row = sqlx::query_as::<_, TenantQuota>(
            r#"
            UPDATE tenant_quotas
            SET max_users = COALESCE($2, max_users),
                max_storage_gb = COALESCE($3, max_storage_gb),
                max_api_keys = COALESCE($4, max_api_keys),
                max_api_requests_per_day = COALESCE($5, max_api_requests_per_day),
                max_notifications_per_day = COALESCE($6, max_notifications_per_day),
                max_log_retention_days = COALESCE($7, max_log_retention_days),
                updated_at = NOW()
            WHERE tenant_id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(payload.max_users)
        .bind(payload.max_storage_gb)
        .bind(payload.max_api_keys)
        .bind(payload.max_api_requests_per_day)
        .bind(payload.max_notifications_per_day)
        .bind(payload.max_log_retention_days)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Check-then-increment atômico: o teste do teto acontece DENTRO do
    /// UPDATE, então duas requisições concorrentes nunca passam as duas
    /// pelo mesmo último slot. Retorna false quando o teto barrou.
    pub async fn try_increment<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        counter: QuotaCounter,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = match counter {
            QuotaCounter::Users => {
                r#"
                UPDATE tenant_quotas
                SET current_users = current_users + 1, updated_at = NOW()
                WHERE tenant_id = $1 AND current_users < max_users
                "#
            }
            QuotaCounter::ApiKeys => {
                r#"
                UPDATE tenant_quotas
                SET current_api_keys = current_api_keys + 1, updated_at = NOW()
                WHERE tenant_id = $1 AND current_api_keys < max_api_keys
                "#
            }
        };

        let result = sqlx::query(sql).bind(tenant_id).execute(executor).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn release<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        counter: QuotaCounter,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = match counter {
            QuotaCounter::Users => {
                r#"
                UPDATE tenant_quotas
                SET current_users = GREATEST(current_users - 1, 0), updated_at = NOW()
                WHERE tenant_id = $1
                "#
            }
            QuotaCounter::ApiKeys => {
                r#"
                UPDATE tenant_quotas
                SET current_api_keys = GREATEST(current_api_keys - 1, 0), updated_at = NOW()
                WHERE tenant_id = $1
                "#
            }
        };

        sqlx::query(sql).bind(tenant_id).execute(executor).await?;
        Ok(())
    }

    /// Zeramento manual e imediato dos contadores de chamadas de API
    /// (diário E mensal), independente da virada automática.
    pub async fn reset_api_calls(&self, quota_id: Uuid) -> Result<Option<TenantQuota>, AppError> {
        let row = sqlx::query_as::<_, TenantQuota>(
            r#"
            UPDATE tenant_quotas
            SET current_api_calls_today = 0,
                current_api_calls_this_month = 0,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(quota_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Virada diária idempotente: só toca quotas cujo último reset ficou
    /// para trás. O contador mensal zera junto quando o mês virou.
    pub async fn apply_daily_rollover(&self, today: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_quotas
            SET current_api_calls_today = 0,
                current_notifications_today = 0,
                current_api_calls_this_month = CASE
                    WHEN date_trunc('month', last_daily_reset::timestamp)
                         < date_trunc('month', $1::date::timestamp)
                    THEN 0
                    ELSE current_api_calls_this_month
                END,
                last_daily_reset = $1,
                updated_at = NOW()
            WHERE last_daily_reset < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Contabiliza uma chamada de API do tenant (diário + mensal) com o
    /// mesmo compare-and-set dos demais contadores: no teto diário a linha
    /// não muda e o retorno é `false`. O mensal não tem teto.
    pub async fn try_record_api_call(&self, tenant_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_quotas
            SET current_api_calls_today = current_api_calls_today + 1,
                current_api_calls_this_month = current_api_calls_this_month + 1,
                updated_at = NOW()
            WHERE tenant_id = $1
              AND current_api_calls_today < max_api_requests_per_day
            "#,
        )
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Settings
    // ---

    pub async fn create_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<TenantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, TenantSettings>(
            r#"
            INSERT INTO tenant_settings (tenant_id, password_policy, notification_settings)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(Json(PasswordPolicy::default()))
        .bind(Json(NotificationSettings::default()))
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn get_settings(&self, tenant_id: Uuid) -> Result<Option<TenantSettings>, AppError> {
        let row = sqlx::query_as::<_, TenantSettings>(
            "SELECT * FROM tenant_settings WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_settings(
        &self,
        tenant_id: Uuid,
        timezone: Option<&str>,
        language: Option<&str>,
        theme: Option<&str>,
        password_policy: Option<&PasswordPolicy>,
        notification_settings: Option<&NotificationSettings>,
    ) -> Result<Option<TenantSettings>, AppError> {
        let row = sqlx::query_as::<_, TenantSettings>(
            r#"
            UPDATE tenant_settings
            SET timezone = COALESCE($2, timezone),
                language = COALESCE($3, language),
                theme = COALESCE($4, theme),
                password_policy = COALESCE($5, password_policy),
                notification_settings = COALESCE($6, notification_settings),
                updated_at = NOW()
            WHERE tenant_id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(timezone)
        .bind(language)
        .bind(theme)
        .bind(password_policy.map(Json))
        .bind(notification_settings.map(Json))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
