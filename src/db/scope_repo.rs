// src/db/scope_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::db_utils::map_unique_violation;
use crate::common::error::AppError;
use crate::common::pagination::ListParams;
use crate::models::scope::{Action, OwnerScope, Resource, ScopeFilter, Service};

// Repositório do catálogo de escopos (services, resources e actions).
// As três tabelas são quase gêmeas; mantemos métodos explícitos por
// entidade para as queries continuarem estáticas e legíveis.
#[derive(Clone)]
pub struct ScopeRepository {
    pool: PgPool,
}

impl ScopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Services
    // ---

    pub async fn create_service(
        &self,
        scope: OwnerScope,
        code: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Service, AppError> {
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (code, name, description, tenant_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(scope.tenant_id())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Já existe um service com esse code neste escopo."))
    }

    pub async fn find_service(&self, id: Uuid) -> Result<Option<Service>, AppError> {
        let row = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_service_by_code(
        &self,
        scope: OwnerScope,
        code: &str,
    ) -> Result<Option<Service>, AppError> {
        let row = sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE code = $1 AND tenant_id IS NOT DISTINCT FROM $2",
        )
        .bind(code)
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // code é imutável: apenas name/description mudam
    pub async fn update_service(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Service>, AppError> {
        let row = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
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

    pub async fn delete_service(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_services(
        &self,
        filter: &ScopeFilter,
        params: &ListParams,
    ) -> Result<(Vec<Service>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, Service>(
            r#"
            SELECT * FROM services
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::bool IS NULL OR is_system = $2)
              AND ($3::text IS NULL OR code ILIKE $3 OR name ILIKE $3)
            ORDER BY code
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.tenant_id)
        .bind(filter.is_system)
        .bind(&search)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM services
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::bool IS NULL OR is_system = $2)
              AND ($3::text IS NULL OR code ILIKE $3 OR name ILIKE $3)
            "#,
        )
        .bind(filter.tenant_id)
        .bind(filter.is_system)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---
    // Resources
    // ---

    pub async fn create_resource(
        &self,
        scope: OwnerScope,
        service_id: Uuid,
        code: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Resource, AppError> {
        sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (service_id, code, name, description, tenant_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(scope.tenant_id())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "Já existe um resource com esse code neste service e escopo.")
        })
    }

    pub async fn find_resource(&self, id: Uuid) -> Result<Option<Resource>, AppError> {
        let row = sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_resource_by_code(
        &self,
        scope: OwnerScope,
        service_id: Uuid,
        code: &str,
    ) -> Result<Option<Resource>, AppError> {
        let row = sqlx::query_as::<_, Resource>(
            r#"
            SELECT * FROM resources
            WHERE service_id = $1 AND code = $2 AND tenant_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(service_id)
        .bind(code)
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_resource(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Resource>, AppError> {
        let row = sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources
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

    pub async fn delete_resource(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_resources(
        &self,
        filter: &ScopeFilter,
        params: &ListParams,
    ) -> Result<(Vec<Resource>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, Resource>(
            r#"
            SELECT * FROM resources
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::bool IS NULL OR is_system = $2)
              AND ($3::text IS NULL OR code ILIKE $3 OR name ILIKE $3)
              AND ($4::uuid IS NULL OR service_id = $4)
            ORDER BY code
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.tenant_id)
        .bind(filter.is_system)
        .bind(&search)
        .bind(filter.service_id)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM resources
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::bool IS NULL OR is_system = $2)
              AND ($3::text IS NULL OR code ILIKE $3 OR name ILIKE $3)
              AND ($4::uuid IS NULL OR service_id = $4)
            "#,
        )
        .bind(filter.tenant_id)
        .bind(filter.is_system)
        .bind(&search)
        .bind(filter.service_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---
    // Actions
    // ---

    pub async fn create_action(
        &self,
        scope: OwnerScope,
        code: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Action, AppError> {
        sqlx::query_as::<_, Action>(
            r#"
            INSERT INTO actions (code, name, description, tenant_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(scope.tenant_id())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Já existe uma action com esse code neste escopo."))
    }

    pub async fn find_action(&self, id: Uuid) -> Result<Option<Action>, AppError> {
        let row = sqlx::query_as::<_, Action>("SELECT * FROM actions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_action_by_code(
        &self,
        scope: OwnerScope,
        code: &str,
    ) -> Result<Option<Action>, AppError> {
        let row = sqlx::query_as::<_, Action>(
            "SELECT * FROM actions WHERE code = $1 AND tenant_id IS NOT DISTINCT FROM $2",
        )
        .bind(code)
        .bind(scope.tenant_id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_action(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Action>, AppError> {
        let row = sqlx::query_as::<_, Action>(
            r#"
            UPDATE actions
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

    pub async fn delete_action(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM actions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_actions(
        &self,
        filter: &ScopeFilter,
        params: &ListParams,
    ) -> Result<(Vec<Action>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, Action>(
            r#"
            SELECT * FROM actions
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::bool IS NULL OR is_system = $2)
              AND ($3::text IS NULL OR code ILIKE $3 OR name ILIKE $3)
            ORDER BY code
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.tenant_id)
        .bind(filter.is_system)
        .bind(&search)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM actions
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::bool IS NULL OR is_system = $2)
              AND ($3::text IS NULL OR code ILIKE $3 OR name ILIKE $3)
            "#,
        )
        .bind(filter.tenant_id)
        .bind(filter.is_system)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---
    // Integridade referencial com o registro de permissões
    // ---

    /// Quantas permissões referenciam esta coluna da tripla. Usado para
    /// bloquear a deleção de entradas do catálogo ainda em uso (deixar
    /// codes pendurados foi descartado de propósito). Entrada de sistema
    /// conta referências de TODOS os escopos, já que permissões de tenant
    /// também podem usar o vocabulário de sistema.
    pub async fn count_permission_references(
        &self,
        column: TripleColumn,
        scope: OwnerScope,
        code: &str,
    ) -> Result<i64, AppError> {
        let sql = match column {
            TripleColumn::Service => {
                "SELECT COUNT(*) FROM permissions WHERE service = $1 \
                 AND ($2::uuid IS NULL OR tenant_id = $2)"
            }
            TripleColumn::Resource => {
                "SELECT COUNT(*) FROM permissions WHERE resource = $1 \
                 AND ($2::uuid IS NULL OR tenant_id = $2)"
            }
            TripleColumn::Action => {
                "SELECT COUNT(*) FROM permissions WHERE action = $1 \
                 AND ($2::uuid IS NULL OR tenant_id = $2)"
            }
        };

        let count: i64 = sqlx::query_scalar(sql)
            .bind(code)
            .bind(scope.tenant_id())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// Qual coluna da tripla de permissão está sendo checada
#[derive(Debug, Clone, Copy)]
pub enum TripleColumn {
    Service,
    Resource,
    Action,
}
