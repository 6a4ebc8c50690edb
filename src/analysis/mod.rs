//! Analysis and result aggregation modules
//!
//! Turns tempo evidence into the final report:
//! - Preferred-range prior and tempo picking
//! - Octave normalization
//! - Candidate aggregation
//! - Result types

pub mod aggregate;
pub mod octave;
pub mod prior;
pub mod result;
