pub mod auth;
pub mod connection_registry;
pub mod event_dispatch;
pub mod order_service;
