//! Analysis modules.
//!
//! Pure aggregation over a queue snapshot; no I/O happens here.

pub mod aggregator;
pub mod participation;

pub use aggregator::*;
pub use participation::{ParticipationMatrix, ParticipationRow, ParticipationTable};
