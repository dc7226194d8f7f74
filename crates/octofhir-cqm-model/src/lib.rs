//! Data contracts consumed by the measure engine
//!
//! This crate provides:
//! - The [`TimelineStore`] and [`CodesetMatcher`] capabilities the engine reads through
//! - [`CodesetRef`] unions of named codesets
//! - [`EventQuery`], the `find(..).within(..).last()` query over a timeline
//! - An in-memory timeline and a JSON-backed codeset catalog

pub mod codeset;
pub mod provider;
pub mod registry;
pub mod retriever;

pub use codeset::*;
pub use provider::*;
pub use registry::*;
pub use retriever::*;
