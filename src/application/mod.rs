pub mod allocation;
pub mod asset_registry;
pub mod btc_converter;
pub mod decision;
pub mod quant;
pub mod router;
pub mod signal_store;
pub mod signals;
