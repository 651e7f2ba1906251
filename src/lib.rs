// src/lib.rs
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod stats;
pub mod store;
pub mod types;
pub mod ws_server;
