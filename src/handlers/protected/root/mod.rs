//! Platform administration endpoints. Routes under /api/root require the
//! tenants:manage permission, which only the root access level carries.

pub mod tenants;
