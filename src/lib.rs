//! # robolink
//!
//! Command-line companion to [`robolink_client`]: layered configuration
//! loading and tracing setup shared by the `robolink` binary.
//!
//! - [`config`]: `RobolinkConfig`, loaded with figment from TOML and
//!   `ROBOLINK_*` environment variables
//! - [`logging`]: `tracing-subscriber` initialization

pub mod config;
pub mod logging;

pub use robolink_client as client;
