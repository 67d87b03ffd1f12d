//! NetScaler Control Center REST access
//!
//! The Control Center provisions load-balancer resources asynchronously and
//! reports their state back through the same REST interface.

pub mod client;
pub mod error;
pub mod paths;

pub use client::{NccClient, NccClientConfig, NccResponse, RemoteClient};
pub use error::NccError;
