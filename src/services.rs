// src/services.rs

pub mod auth;
pub mod chatbot;
pub mod mailer;
pub mod openrouter;
pub mod stats;
pub mod transitions;
pub mod ui_builder;

pub use auth::AuthService;
pub use chatbot::ChatbotService;
pub use mailer::Mailer;
pub use ui_builder::UiBuilderService;
