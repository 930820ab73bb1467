pub mod auth;
pub mod events;
pub mod inventory;
pub mod order;
pub mod rbac;
