pub mod auth;
pub mod chat;
pub mod crm;
pub mod dashboard;
pub mod invoice;
pub mod target;
pub mod ui_config;
