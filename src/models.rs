pub mod api_key;
pub mod auth;
pub mod permission;
pub mod role;
pub mod scope;
pub mod tenancy;
