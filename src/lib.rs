pub mod config;
pub mod credentials;
pub mod domain;
pub mod endpoints;
pub mod error;
pub mod files;
pub mod output;
pub mod query;
pub mod session;
pub mod transfer;
pub mod transport;
