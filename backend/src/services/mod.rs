//! Business logic services for the Farm Zone Analysis Platform

pub mod analysis;
pub mod farm;
pub mod polling;
pub mod worker;

pub use analysis::AnalysisService;
pub use farm::FarmService;
pub use polling::{poll_until_terminal, PollError, PollPolicy};
pub use worker::{AnalysisWorker, DemoSpectralSource, SpectralSource};
