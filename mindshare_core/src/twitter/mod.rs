pub mod auth;
pub mod client;
pub mod dto;
pub mod score;
pub mod storage;
