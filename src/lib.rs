pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod repository;
pub mod routes;
pub mod rules;
pub mod schema;
pub mod seed;
pub mod state;
pub mod utils;
