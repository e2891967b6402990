pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod search;
pub mod services;
pub mod state;
pub mod time;
