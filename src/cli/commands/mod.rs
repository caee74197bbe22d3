pub mod bookmark;
pub mod config;
pub mod query;
