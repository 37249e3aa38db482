//! Shared types and models for the Farm Zone Analysis Platform
//!
//! This crate contains the grid partitioner, zone scoring and analysis
//! lifecycle types shared between the backend and the browser (via WASM).

pub mod grid;
pub mod models;
pub mod types;
pub mod validation;
pub mod zone_health;

pub use grid::*;
pub use models::*;
pub use types::*;
pub use validation::*;
pub use zone_health::*;
