// Library root for the Jolokia gateway

pub mod core;
pub mod protocol;
pub mod engine;
pub mod loader;
pub mod auth;
pub mod api;
pub mod proxy;
pub mod utils;
pub mod config;
