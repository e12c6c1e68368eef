// src/db/role_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::db_utils::map_unique_violation;
use crate::common::error::AppError;
use crate::common::pagination::ListParams;
use crate::models::auth::User;
use crate::models::permission::Permission;
use crate::models::role::{Role, RoleFilter};
use crate::models::scope::OwnerScope;

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Mutação que participa de transação recebe o executor, como nos
    // demais fluxos transacionais do serviço.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        scope: OwnerScope,
        code: &str,
        name: &str,
        description: Option<&str>,
        is_system: bool,
        is_default: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (code, name, description, is_system, is_default, tenant_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(is_system)
        .bind(is_default)
        .bind(scope.tenant_id())
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Já existe um cargo com esse code neste escopo."))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        let row = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    // code e tenant_id são imutáveis
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Role>, AppError> {
        let row = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
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

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        filter: &RoleFilter,
        params: &ListParams,
    ) -> Result<(Vec<Role>, i64), AppError> {
        let search = params.search_like();

        let rows = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE ($1::bool IS NULL OR is_system = $1)
              AND ($2::bool IS NULL OR is_default = $2)
              AND ($3::uuid IS NULL OR tenant_id = $3)
              AND ($4::bool IS NULL OR (tenant_id IS NULL) = $4)
              AND ($5::text IS NULL OR code ILIKE $5 OR name ILIKE $5)
            ORDER BY code
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.is_system)
        .bind(filter.is_default)
        .bind(filter.tenant_id)
        .bind(filter.is_global)
        .bind(&search)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM roles
            WHERE ($1::bool IS NULL OR is_system = $1)
              AND ($2::bool IS NULL OR is_default = $2)
              AND ($3::uuid IS NULL OR tenant_id = $3)
              AND ($4::bool IS NULL OR (tenant_id IS NULL) = $4)
              AND ($5::text IS NULL OR code ILIKE $5 OR name ILIKE $5)
            "#,
        )
        .bind(filter.is_system)
        .bind(filter.is_default)
        .bind(filter.tenant_id)
        .bind(filter.is_global)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    // ---
    // Cargo padrão (no máximo um por escopo dono)
    // ---

    /// Limpa o flag de qualquer outro cargo padrão do mesmo escopo antes
    /// de marcar o novo — sempre dentro da mesma transação.
    pub async fn clear_default_in_scope<'e, E>(
        &self,
        executor: E,
        scope: OwnerScope,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE roles SET is_default = FALSE, updated_at = NOW()
            WHERE is_default AND tenant_id IS NOT DISTINCT FROM $1
            "#,
        )
        .bind(scope.tenant_id())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_default_flag<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        value: bool,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Role>(
            "UPDATE roles SET is_default = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(value)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    // ---
    // Vínculo Cargo <-> Permissão
    // ---

    // Inserção em massa usando UNNEST; o ON CONFLICT dá a idempotência
    // (re-atribuir um id já presente é um no-op, não um erro)
    pub async fn assign_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn remove_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = ANY($2)",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn permissions_of(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.code
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---
    // Vínculo Usuário <-> Cargo
    // ---

    pub async fn assign_users<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT unnest($2::uuid[]), $1
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(user_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn remove_users<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM user_roles WHERE role_id = $1 AND user_id = ANY($2)")
            .bind(role_id)
            .bind(user_ids)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn users_count(&self, role_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // Usuários que possuem este cargo (tela "usuários do cargo")
    pub async fn list_users(
        &self,
        role_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<User>, i64), AppError> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            WHERE ur.role_id = $1
            ORDER BY u.username
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role_id)
        .bind(params.page_size())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = self.users_count(role_id).await?;

        Ok((rows, total))
    }
}
