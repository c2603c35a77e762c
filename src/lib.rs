pub mod commands;
pub mod config;
pub mod controller;
pub mod corpus;
pub mod error;
pub mod keyboard;
pub mod matcher;
pub mod platform;
pub mod question;
pub mod session;
pub mod state;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
