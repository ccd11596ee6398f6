// src/handlers.rs

pub mod auth;
pub mod chatbot;
pub mod contacts;
pub mod dashboard;
pub mod invoices;
pub mod opportunities;
pub mod targets;
pub mod tasks;
pub mod ui_config;
