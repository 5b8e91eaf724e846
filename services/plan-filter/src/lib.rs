//! Repair and validation of model-generated monthly workout and meal plans.
//!
//! Raw model text goes through [`json_relaxed`] (text repair, slicing and
//! truncation repair), [`extractor`], [`cleaner`], [`completeness`] and
//! [`validator`]; [`PlanFilter`] runs them in that order.

pub mod cleaner;
pub mod completeness;
pub mod extractor;
pub mod json_relaxed;
pub mod pipeline;
pub mod repair;
pub mod sanitize;
pub mod truncation;
pub mod validator;

pub use json_relaxed::Strategy;
pub use pipeline::{FilterCfg, FilterOutcome, PlanFilter};
