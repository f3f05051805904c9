//! friction-lab: friction coefficient analysis for sliding-block measurements.
//!
//! Reduces interval readings, propagates first-order uncertainties through
//! normal force and friction coefficient, aggregates repeated readings under
//! an explicit policy, and exports tables and dual-axis charts.

pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod interval;
pub mod output;
pub mod pipeline;
pub mod propagation;
pub mod report;
pub mod stats;
pub mod types;

pub use error::{LabError, Result};
pub use types::{Estimate, ReducedValue, Undefined};
