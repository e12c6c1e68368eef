// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_tenants,
        handlers::tenancy::get_tenant,
        handlers::tenancy::update_tenant,
        handlers::tenancy::delete_tenant,
        handlers::tenancy::add_member,
        handlers::tenancy::list_members,
        handlers::tenancy::update_member,
        handlers::tenancy::remove_member,
        handlers::tenancy::get_quota,
        handlers::tenancy::update_quota,
        handlers::tenancy::reset_api_calls,
        handlers::tenancy::get_settings,
        handlers::tenancy::update_settings,

        // --- Catálogo ---
        handlers::scopes::create_service,
        handlers::scopes::list_services,
        handlers::scopes::get_service,
        handlers::scopes::update_service,
        handlers::scopes::delete_service,
        handlers::scopes::create_resource,
        handlers::scopes::list_resources,
        handlers::scopes::get_resource,
        handlers::scopes::update_resource,
        handlers::scopes::delete_resource,
        handlers::scopes::create_action,
        handlers::scopes::list_actions,
        handlers::scopes::get_action,
        handlers::scopes::update_action,
        handlers::scopes::delete_action,
        handlers::scopes::import_defaults,

        // --- RBAC ---
        handlers::permissions::create_permission,
        handlers::permissions::list_permissions,
        handlers::permissions::get_permission,
        handlers::permissions::update_permission,
        handlers::permissions::delete_permission,
        handlers::permissions::import_defaults,
        handlers::roles::create_role,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::roles::set_default,
        handlers::roles::unset_default,
        handlers::roles::assign_permissions,
        handlers::roles::remove_permissions,
        handlers::roles::assign_users,
        handlers::roles::remove_users,
        handlers::roles::list_role_users,

        // --- API Keys ---
        handlers::api_keys::create_system_key,
        handlers::api_keys::create_user_key,
        handlers::api_keys::list_api_keys,
        handlers::api_keys::stats,
        handlers::api_keys::get_api_key,
        handlers::api_keys::update_api_key,
        handlers::api_keys::delete_api_key,
        handlers::api_keys::activate,
        handlers::api_keys::deactivate,
        handlers::api_keys::renew,
        handlers::api_keys::reveal_hash,
        handlers::api_keys::usage_logs,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::TenantStatus,
            models::tenancy::Tenant,
            models::tenancy::CreateTenantPayload,
            models::tenancy::UpdateTenantPayload,
            models::tenancy::DeleteTenantPayload,
            models::tenancy::MemberRole,
            models::tenancy::AssignableRole,
            models::tenancy::TenantUser,
            models::tenancy::AddMemberPayload,
            models::tenancy::UpdateMemberPayload,
            models::tenancy::TenantQuota,
            models::tenancy::UpdateQuotaPayload,
            models::tenancy::PasswordPolicy,
            models::tenancy::NotificationSettings,
            models::tenancy::TenantSettings,
            models::tenancy::UpdateSettingsPayload,

            // --- Catálogo ---
            models::scope::Service,
            models::scope::Resource,
            models::scope::Action,
            models::scope::CreateScopeEntryPayload,
            models::scope::UpdateScopeEntryPayload,
            models::scope::ImportReport,

            // --- RBAC ---
            models::permission::Permission,
            models::permission::CreatePermissionPayload,
            models::permission::UpdatePermissionPayload,
            models::role::Role,
            models::role::RoleDetail,
            models::role::CreateRolePayload,
            models::role::UpdateRolePayload,
            models::role::PermissionBatchPayload,
            models::role::UserBatchPayload,

            // --- API Keys ---
            models::api_key::ApiKeyType,
            models::api_key::ApiKey,
            models::api_key::KeyState,
            models::api_key::KeyScope,
            models::api_key::ApiKeyDetail,
            models::api_key::CreatedApiKey,
            models::api_key::CreateSystemKeyPayload,
            models::api_key::CreateUserKeyPayload,
            models::api_key::UpdateApiKeyPayload,
            models::api_key::RenewApiKeyPayload,
            models::api_key::RevealHashPayload,
            models::api_key::RevealedHash,
            models::api_key::ApiKeyUsageLog,
            models::api_key::ApiKeyStats,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Tenancy", description = "Tenants, Membros, Quotas e Configurações"),
        (name = "Catálogo", description = "Vocabulário de Escopos (Services, Resources, Actions)"),
        (name = "RBAC", description = "Permissões e Cargos"),
        (name = "API Keys", description = "Credenciais não interativas com escopo próprio")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
        );
    }
}
