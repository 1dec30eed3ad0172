#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region classification and aggregate views over disaster records.
//!
//! [`aggregate::aggregate`] is a pure reducer: it takes the full normalized
//! record set and returns every chart view at once. Nothing is accumulated
//! incrementally across fetches.

pub mod aggregate;
pub mod region;

pub use aggregate::{aggregate, aggregate_for};
pub use region::classify;
