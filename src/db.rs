pub mod api_key_repo;
pub use api_key_repo::ApiKeyRepository;
pub mod permission_repo;
pub use permission_repo::PermissionRepository;
pub mod role_repo;
pub use role_repo::RoleRepository;
pub mod scope_repo;
pub use scope_repo::ScopeRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
