//! HTTP request handlers

pub mod analysis;
pub mod farm;
pub mod health;

pub use analysis::*;
pub use farm::*;
pub use health::*;
