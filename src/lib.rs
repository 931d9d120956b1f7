pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod selector;
pub mod stats;
pub mod sync;
