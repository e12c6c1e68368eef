// src/db/api_key_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::db_utils::map_unique_violation;
use crate::common::error::AppError;
use crate::common::pagination::ListParams;
use crate::models::api_key::{
    ApiKey, ApiKeyFilter, ApiKeyStats, ApiKeyType, ApiKeyUsageLog, KeyScope, UsageEntry,
};

#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        key_type: ApiKeyType,
        prefix: &str,
        secret_hash: &str,
        name: &str,
        application_name: Option<&str>,
        tenant_id: Option<Uuid>,
        user_id: Option<Uuid>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys
                (key_type, prefix, secret_hash, name, application_name,
                 tenant_id, user_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(key_type)
        .bind(prefix)
        .bind(secret_hash)
        .bind(name)
        .bind(application_name)
        .bind(tenant_id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Colisão de chave gerada, tente novamente."))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, AppError> {
        let row = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// A autenticação nunca compara segredos em claro: a chave recebida é
    /// hasheada e procurada pelo hash.
    pub async fn find_by_secret_hash(&self, secret_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let row = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE secret_hash = $1")
            .bind(secret_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        application_name: Option<&str>,
        is_active: Option<bool>,
        tenant_id: Option<Uuid>,
    ) -> Result<Option<ApiKey>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET name = COALESCE($2, name),
                application_name = COALESCE($3, application_name),
                is_active = COALESCE($4, is_active),
                tenant_id = COALESCE($5, tenant_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(application_name)
        .bind(is_active)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn set_active(&self, id: Uuid, value: bool) -> Result<Option<ApiKey>, AppError> {
        let row = sqlx::query_as::<_, ApiKey>(
            "UPDATE api_keys SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Renovar é a única saída do estado expirado: empurra expires_at para
    /// frente e, quando `reactivate` vale, religa o flag. Uma chave
    /// desativada manualmente dentro da validade continua desativada.
    pub async fn renew(
        &self,
        id: Uuid,
        new_expires_at: DateTime<Utc>,
        reactivate: bool,
    ) -> Result<Option<ApiKey>, AppError> {
        let row = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET expires_at = $2, is_active = is_active OR $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new_expires_at)
        .bind(reactivate)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ApiKey>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Escopos e logs caem via ON DELETE CASCADE
        let row = sqlx::query_as::<_, ApiKey>("DELETE FROM api_keys WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn list(
        &self,
        filter: &ApiKeyFilter,
        params: &ListParams,
    ) -> Result<(Vec<ApiKey>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT * FROM api_keys
            WHERE ($1::api_key_type IS NULL OR key_type = $1)
              AND ($2::uuid IS NULL OR tenant_id = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
              AND ($4::bool IS NULL OR is_active = $4)
              AND ($5::text IS NULL OR name ILIKE $5 OR prefix ILIKE $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.key_type)
        .bind(filter.tenant_id)
        .bind(filter.user_id)
        .bind(filter.is_active)
        .bind(&search)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM api_keys
            WHERE ($1::api_key_type IS NULL OR key_type = $1)
              AND ($2::uuid IS NULL OR tenant_id = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
              AND ($4::bool IS NULL OR is_active = $4)
              AND ($5::text IS NULL OR name ILIKE $5 OR prefix ILIKE $5)
            "#,
        )
        .bind(filter.key_type)
        .bind(filter.tenant_id)
        .bind(filter.user_id)
        .bind(filter.is_active)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---
    // Escopos
    // ---

    pub async fn add_scopes<'e, E>(
        &self,
        executor: E,
        api_key_id: Uuid,
        scopes: &[KeyScope],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if scopes.is_empty() {
            return Ok(());
        }

        let services: Vec<&str> = scopes.iter().map(|s| s.service.as_str()).collect();
        let resources: Vec<&str> = scopes.iter().map(|s| s.resource.as_str()).collect();
        let actions: Vec<&str> = scopes.iter().map(|s| s.action.as_str()).collect();

        sqlx::query(
            r#"
            INSERT INTO api_key_scopes (api_key_id, service, resource, action)
            SELECT $1, * FROM unnest($2::text[], $3::text[], $4::text[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(api_key_id)
        .bind(&services)
        .bind(&resources)
        .bind(&actions)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn clear_scopes<'e, E>(&self, executor: E, api_key_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM api_key_scopes WHERE api_key_id = $1")
            .bind(api_key_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn scopes_of(&self, api_key_id: Uuid) -> Result<Vec<KeyScope>, AppError> {
        let rows = sqlx::query_as::<_, KeyScope>(
            r#"
            SELECT service, resource, action FROM api_key_scopes
            WHERE api_key_id = $1
            ORDER BY service, resource, action
            "#,
        )
        .bind(api_key_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---
    // Uso
    // ---

    pub async fn touch_last_used(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_usage_log(&self, entry: &UsageEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO api_key_usage_logs
                (api_key_id, tenant_id, request_path, request_method,
                 response_status, client_ip, request_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.api_key_id)
        .bind(entry.tenant_id)
        .bind(&entry.request_path)
        .bind(&entry.request_method)
        .bind(entry.response_status)
        .bind(&entry.client_ip)
        .bind(&entry.request_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_usage_logs(
        &self,
        api_key_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<ApiKeyUsageLog>, i64), AppError> {
        let rows = sqlx::query_as::<_, ApiKeyUsageLog>(
            r#"
            SELECT * FROM api_key_usage_logs
            WHERE api_key_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(api_key_id)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM api_key_usage_logs WHERE api_key_id = $1")
                .bind(api_key_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    /// Painel de estatísticas: uma única passada com agregação condicional.
    pub async fn stats(&self, tenant_id: Option<Uuid>) -> Result<ApiKeyStats, AppError> {
        let (total_keys, system_keys, user_keys, active_keys, inactive_keys, expired_keys): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE key_type = 'system'),
                COUNT(*) FILTER (WHERE key_type = 'user'),
                COUNT(*) FILTER (WHERE is_active AND (expires_at IS NULL OR expires_at > NOW())),
                COUNT(*) FILTER (WHERE NOT is_active AND (expires_at IS NULL OR expires_at > NOW())),
                COUNT(*) FILTER (WHERE expires_at IS NOT NULL AND expires_at <= NOW())
            FROM api_keys
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ApiKeyStats {
            total_keys,
            system_keys,
            user_keys,
            active_keys,
            inactive_keys,
            expired_keys,
        })
    }
}
