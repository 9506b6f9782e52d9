pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod services;
pub mod state;
