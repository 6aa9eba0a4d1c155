pub mod config;
pub mod movie;
