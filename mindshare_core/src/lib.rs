pub mod auth_service;
pub mod config;
pub mod error;
pub mod region;
pub mod twitter;
pub mod users;
