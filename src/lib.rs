pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
