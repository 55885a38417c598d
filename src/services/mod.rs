pub mod audit_service;
pub mod business_service;
pub mod group_service;
pub mod role_service;
pub mod rule_service;
pub mod tenant_service;
pub mod user_service;
