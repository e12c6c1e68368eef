// src/db/permission_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::db_utils::map_unique_violation;
use crate::common::error::AppError;
use crate::common::pagination::ListParams;
use crate::models::permission::{Permission, PermissionFilter};
use crate::models::scope::OwnerScope;

#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

// A visão "achatada" de permissão que o avaliador de autorização consome:
// só a tripla + o nível/dono, sem metadados de exibição.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EffectivePermission {
    pub service: String,
    pub resource: String,
    pub action: String,
    pub is_tenant_level: bool,
    pub tenant_id: Option<Uuid>,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        scope: OwnerScope,
        code: &str,
        name: &str,
        description: Option<&str>,
        service: &str,
        resource: &str,
        action: &str,
    ) -> Result<Permission, AppError> {
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (code, name, description, service, resource, action, is_tenant_level, tenant_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(service)
        .bind(resource)
        .bind(action)
        .bind(!scope.is_system())
        .bind(scope.tenant_id())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "Já existe uma permissão com esse code neste escopo.")
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Permission>, AppError> {
        let row = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_code(
        &self,
        scope: OwnerScope,
        code: &str,
    ) -> Result<Option<Permission>, AppError> {
        let row = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE code = $1 AND tenant_id IS NOT DISTINCT FROM $2",
        )
        .bind(code)
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // A tripla e o tenant dono são imutáveis; só metadados mudam aqui
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Permission>, AppError> {
        let row = sqlx::query_as::<_, Permission>(
            r#"
            UPDATE permissions
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // Apagar uma permissão apenas a desvincula dos cargos (ON DELETE CASCADE
    // na tabela de junção), nunca apaga o cargo.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        filter: &PermissionFilter,
        params: &ListParams,
    ) -> Result<(Vec<Permission>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, Permission>(
            r#"
            SELECT * FROM permissions
            WHERE ($1::text IS NULL OR service = $1)
              AND ($2::text IS NULL OR resource = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::bool IS NULL OR is_system = $4)
              AND ($5::bool IS NULL OR is_tenant_level = $5)
              AND ($6::uuid IS NULL OR tenant_id = $6)
              AND ($7::text IS NULL OR code ILIKE $7 OR name ILIKE $7)
            ORDER BY code
            LIMIT $8 OFFSET $9
            "#,
        )
        .bind(&filter.service)
        .bind(&filter.resource)
        .bind(&filter.action)
        .bind(filter.is_system)
        .bind(filter.is_tenant_level)
        .bind(filter.tenant_id)
        .bind(&search)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM permissions
            WHERE ($1::text IS NULL OR service = $1)
              AND ($2::text IS NULL OR resource = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::bool IS NULL OR is_system = $4)
              AND ($5::bool IS NULL OR is_tenant_level = $5)
              AND ($6::uuid IS NULL OR tenant_id = $6)
              AND ($7::text IS NULL OR code ILIKE $7 OR name ILIKE $7)
            "#,
        )
        .bind(&filter.service)
        .bind(&filter.resource)
        .bind(&filter.action)
        .bind(filter.is_system)
        .bind(filter.is_tenant_level)
        .bind(filter.tenant_id)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Dos ids pedidos, quais existem de verdade. Lotes de atribuição a
    /// cargos são tudo-ou-nada: o serviço compara os conjuntos antes de
    /// aplicar qualquer mutação.
    pub async fn find_existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        let found: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM permissions WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(found.into_iter().map(|(id,)| id).collect())
    }

    /// O conjunto efetivo de permissões de um usuário: a união das
    /// permissões de todos os cargos que ele possui que sejam globais
    /// (tenant_id IS NULL) ou do tenant do contexto da requisição.
    pub async fn effective_for_user(
        &self,
        user_id: Uuid,
        tenant_context: Option<Uuid>,
    ) -> Result<Vec<EffectivePermission>, AppError> {
        let rows = sqlx::query_as::<_, EffectivePermission>(
            r#"
            SELECT DISTINCT p.service, p.resource, p.action, p.is_tenant_level, p.tenant_id
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN roles r ON r.id = rp.role_id
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
              AND (r.tenant_id IS NULL OR r.tenant_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(tenant_context)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
