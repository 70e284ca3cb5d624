pub mod adapters;
pub mod ai_client;
pub mod cache;
pub mod collector;
pub mod core;
pub mod store;
