pub mod config;
pub mod contexts;
pub mod data;
pub mod publish_ledger;
pub mod registries;
