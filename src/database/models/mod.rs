pub mod audit;
pub mod business;
pub mod group;
pub mod role;
pub mod rule;
pub mod tenant;
pub mod user;

pub use audit::AuditEventRow;
pub use business::Business;
pub use group::Group;
pub use role::IamRole;
pub use rule::Rule;
pub use tenant::Tenant;
pub use user::User;
