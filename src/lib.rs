pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod ranking_store;
pub mod types;
pub mod world;
