// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{
        ApiKeyRepository, PermissionRepository, RoleRepository, ScopeRepository,
        TenantRepository, UserRepository,
    },
    services::{
        api_key_service::ApiKeyService, auth::AuthService, authz::AuthzService,
        permission_service::PermissionService, role_service::RoleService,
        scope_service::ScopeService, tenancy_service::TenantService, usage_log::UsageLogWriter,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,

    pub user_repo: UserRepository,
    pub tenant_repo: TenantRepository,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub scope_service: ScopeService,
    pub permission_service: PermissionService,
    pub role_service: RoleService,
    pub api_key_service: ApiKeyService,
    pub authz: AuthzService,
    pub usage_log: UsageLogWriter,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let scope_repo = ScopeRepository::new(db_pool.clone());
        let permission_repo = PermissionRepository::new(db_pool.clone());
        let role_repo = RoleRepository::new(db_pool.clone());
        let api_key_repo = ApiKeyRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), jwt_secret);
        let tenant_service = TenantService::new(tenant_repo.clone(), db_pool.clone());
        let scope_service = ScopeService::new(scope_repo.clone());
        let permission_service =
            PermissionService::new(permission_repo.clone(), scope_repo);
        let role_service = RoleService::new(
            role_repo,
            permission_repo.clone(),
            user_repo.clone(),
            db_pool.clone(),
        );
        let api_key_service = ApiKeyService::new(
            api_key_repo.clone(),
            tenant_repo.clone(),
            user_repo.clone(),
            auth_service.clone(),
            db_pool.clone(),
        );
        let authz = AuthzService::new(permission_repo);
        let usage_log = UsageLogWriter::spawn(api_key_repo);

        Ok(Self {
            db_pool,
            user_repo,
            tenant_repo,
            auth_service,
            tenant_service,
            scope_service,
            permission_service,
            role_service,
            api_key_service,
            authz,
            usage_log,
        })
    }
}
