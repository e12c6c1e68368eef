// src/handlers.rs

pub mod api_keys;
pub mod auth;
pub mod permissions;
pub mod roles;
pub mod scopes;
pub mod tenancy;
