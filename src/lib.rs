//! Identity service: user registration, credential checks and JWT issuance.

pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod state;
pub mod users;
