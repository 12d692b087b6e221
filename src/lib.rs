//! RESFET test-stand controller library.
//!
//! Exposes the domain modules and adapters for the binary, integration
//! tests, and fuzz targets.  Domain code reaches hardware only through
//! the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod safety;
pub mod sampling;
pub mod sensors;
pub mod server;
pub mod telemetry;
pub mod worker;
