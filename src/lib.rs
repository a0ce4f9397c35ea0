pub mod api;
pub mod archive;
pub mod config;
pub mod gate;
pub mod humanize;
pub mod ledger;
pub mod observability;
pub mod scheduler;
pub mod storage;
pub mod worker;
