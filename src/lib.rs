pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod server;
pub mod tech_stack;
