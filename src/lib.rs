pub mod aws;
pub mod checks;
pub mod config;
pub mod error;
pub mod logging;
pub mod payload;
pub mod platform;
