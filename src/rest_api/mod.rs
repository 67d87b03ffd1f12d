//! REST API module for external integrations
//!
//! Exposes the driver's lifecycle operations over HTTP, together with
//! health and metrics endpoints.

mod dto;
mod handlers;
mod server;

use std::sync::Arc;

use crate::driver::Driver;
use crate::store::MemoryStore;

pub use dto::{ErrorResponse, HealthResponse, ListResponse, PoolQuery};
pub use server::{build_router, run_server};

/// Shared state of all handlers
pub struct ApiState {
    pub driver: Driver,
    pub store: Arc<MemoryStore>,
}

impl ApiState {
    pub fn new(driver: Driver, store: Arc<MemoryStore>) -> Self {
        Self { driver, store }
    }
}
