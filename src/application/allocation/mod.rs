pub mod multi_account;
pub mod tracker;
