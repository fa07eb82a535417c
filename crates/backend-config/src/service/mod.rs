//! Backend-config service module facade.
//!
//! Re-exports the service API and wires the submodules implementing the poll
//! drivers, task supervision, configuration, and telemetry hooks.

pub(crate) mod config;
mod core;
pub(crate) mod poller;
pub(crate) mod supervise;
pub(crate) mod telemetry;
#[cfg(test)]
pub(crate) mod test_support;

pub use config::ServiceConfig;
pub use core::*;
pub use telemetry::BackendConfigTelemetry;
