//! Received events and the window they are grouped into.
//!
//! An event moves one way only: pending (unconsumed) to consumed, either
//! because it was part of a published window or because the window was reset.

pub mod types;

pub use types::{Event, HeaderMap, NewEvent, WindowEvents};
