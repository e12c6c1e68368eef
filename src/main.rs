//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

// De quanto em quanto tempo o job de virada diária re-checa as quotas.
// A virada em si é idempotente, então re-checar barato e frequente é ok.
const ROLLOVER_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Job de fundo: virada diária (e mensal) dos contadores de quota
    let rollover_repo = app_state.tenant_repo.clone();
    tokio::spawn(async move {
        loop {
            let today = chrono::Utc::now().date_naive();
            match rollover_repo.apply_daily_rollover(today).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("🔄 Virada diária aplicada em {} quota(s).", n),
                Err(e) => tracing::error!("Falha na virada diária de quotas: {}", e),
            }
            tokio::time::sleep(ROLLOVER_CHECK_INTERVAL).await;
        }
    });

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me));

    let tenancy_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_tenants),
        )
        .route(
            "/{id}",
            get(handlers::tenancy::get_tenant)
                .put(handlers::tenancy::update_tenant)
                .delete(handlers::tenancy::delete_tenant),
        )
        .route(
            "/{id}/members",
            post(handlers::tenancy::add_member).get(handlers::tenancy::list_members),
        )
        .route(
            "/{id}/members/{member_id}",
            axum::routing::put(handlers::tenancy::update_member)
                .delete(handlers::tenancy::remove_member),
        )
        .route(
            "/{id}/quota",
            get(handlers::tenancy::get_quota).put(handlers::tenancy::update_quota),
        )
        .route(
            "/{id}/settings",
            get(handlers::tenancy::get_settings).put(handlers::tenancy::update_settings),
        );

    let quota_routes = Router::new()
        .route("/{id}/reset-api-calls", post(handlers::tenancy::reset_api_calls));

    let scope_routes = Router::new()
        .route(
            "/services",
            post(handlers::scopes::create_service).get(handlers::scopes::list_services),
        )
        .route(
            "/services/{id}",
            get(handlers::scopes::get_service)
                .put(handlers::scopes::update_service)
                .delete(handlers::scopes::delete_service),
        )
        .route(
            "/resources",
            post(handlers::scopes::create_resource).get(handlers::scopes::list_resources),
        )
        .route(
            "/resources/{id}",
            get(handlers::scopes::get_resource)
                .put(handlers::scopes::update_resource)
                .delete(handlers::scopes::delete_resource),
        )
        .route(
            "/actions",
            post(handlers::scopes::create_action).get(handlers::scopes::list_actions),
        )
        .route(
            "/actions/{id}",
            get(handlers::scopes::get_action)
                .put(handlers::scopes::update_action)
                .delete(handlers::scopes::delete_action),
        )
        .route("/import-defaults", post(handlers::scopes::import_defaults));

    let permission_routes = Router::new()
        .route(
            "/",
            post(handlers::permissions::create_permission)
                .get(handlers::permissions::list_permissions),
        )
        .route("/import-defaults", post(handlers::permissions::import_defaults))
        .route(
            "/{id}",
            get(handlers::permissions::get_permission)
                .put(handlers::permissions::update_permission)
                .delete(handlers::permissions::delete_permission),
        );

    let role_routes = Router::new()
        .route(
            "/",
            post(handlers::roles::create_role).get(handlers::roles::list_roles),
        )
        .route(
            "/{id}",
            get(handlers::roles::get_role)
                .put(handlers::roles::update_role)
                .delete(handlers::roles::delete_role),
        )
        .route("/{id}/set-default", post(handlers::roles::set_default))
        .route("/{id}/unset-default", post(handlers::roles::unset_default))
        .route("/{id}/assign-permissions", post(handlers::roles::assign_permissions))
        .route("/{id}/remove-permissions", post(handlers::roles::remove_permissions))
        .route("/{id}/assign-users", post(handlers::roles::assign_users))
        .route("/{id}/remove-users", post(handlers::roles::remove_users))
        .route("/{id}/users", get(handlers::roles::list_role_users));

    let api_key_routes = Router::new()
        .route("/", get(handlers::api_keys::list_api_keys))
        // rotas fixas antes das rotas com {id}
        .route("/system", post(handlers::api_keys::create_system_key))
        .route("/user", post(handlers::api_keys::create_user_key))
        .route("/stats", get(handlers::api_keys::stats))
        .route("/reveal-hash", post(handlers::api_keys::reveal_hash))
        .route(
            "/{id}",
            get(handlers::api_keys::get_api_key)
                .put(handlers::api_keys::update_api_key)
                .delete(handlers::api_keys::delete_api_key),
        )
        .route("/{id}/activate", post(handlers::api_keys::activate))
        .route("/{id}/deactivate", post(handlers::api_keys::deactivate))
        .route("/{id}/renew", post(handlers::api_keys::renew))
        .route("/{id}/usage-logs", get(handlers::api_keys::usage_logs));

    // Tudo que não é login/registro exige credencial (JWT ou X-Api-Key)
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api/quotas", quota_routes)
        .nest("/api/scopes", scope_routes)
        .nest("/api/permissions", permission_routes)
        .nest("/api/roles", role_routes)
        .nest("/api/api-keys", api_key_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        )
        .with_state(app_state);

    // Inicia o servidor
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
