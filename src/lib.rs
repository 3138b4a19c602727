pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod matching;
pub mod profile;
pub mod state;
