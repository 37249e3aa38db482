//! Domain models for farm zone analysis

mod analysis;
mod farm;
mod roi;
mod zone;

pub use analysis::*;
pub use farm::*;
pub use roi::*;
pub use zone::*;
