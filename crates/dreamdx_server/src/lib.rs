//! HTTP endpoint of the DreamDX narrative service.
//!
//! - [`DreamConfig`] - layered TOML and environment configuration
//! - [`create_router`] - axum routes for every command
//! - [`run`] - assemble the service from configuration and serve it

mod api;
mod config;
mod server;

pub use api::{ApiError, ApiState, COMMAND_PATHS, create_router, status_for};
pub use config::{
    DEFAULT_CONFIG_FILE, DreamConfig, ENV_PREFIX, GatewaySettings, GeneratorSettings,
    LoggingSettings, ServerSettings, StorageBackend, StorageSettings,
};
pub use server::{build_driver, build_service, build_store, run, serve};
