//! Clinical quality measure value types
//!
//! This crate defines the plain values exchanged between the timeline store,
//! the evaluation engine and result consumers:
//!
//! - [`Timeframe`] and [`Lookback`]: reporting periods and historical windows
//! - [`Patient`] and [`ClinicalEvent`]: the longitudinal record the engine reads
//! - [`PopulationState`]: per sub-population verdicts
//! - [`MeasureResult`] and [`Recommendation`]: the serializable evaluation output

pub mod event;
pub mod patient;
pub mod population;
pub mod result;
pub mod timeframe;

pub use event::{ClinicalEvent, Coding, EventCategory, EventId};
pub use patient::Patient;
pub use population::{PopulationId, PopulationState};
pub use result::{ActionKind, MeasureResult, MeasureStatus, Recommendation, SupportingContext};
pub use timeframe::{Lookback, Timeframe};
