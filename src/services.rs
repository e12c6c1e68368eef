// src/services.rs

pub mod api_key_service;
pub mod auth;
pub mod authz;
pub mod permission_service;
pub mod role_service;
pub mod scope_service;
pub mod tenancy_service;
pub mod usage_log;
