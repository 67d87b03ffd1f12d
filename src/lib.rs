//! netscaler-lbaas: load-balancer driver for NetScaler Control Center
//!
//! This crate forwards load-balancer lifecycle requests (VIPs, pools,
//! members and health monitors) to a NetScaler Control Center and keeps
//! the local status of each resource in step with what the Control Center
//! reports.

pub mod collector;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod model;
pub mod ncc;
pub mod network;
pub mod store;

#[cfg(feature = "rest-api")]
pub mod rest_api;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::error::{Error, Result};
