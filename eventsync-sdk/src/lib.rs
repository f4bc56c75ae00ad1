//! Shared types for EventSync.
//!
//! The server, the core engine and external clients all speak in terms of
//! the types defined here: the service description document, the published
//! aggregate payload and the administrative API responses.

#![forbid(unsafe_code)]

pub mod headers;
pub mod objects;

#[cfg(feature = "client")]
pub mod client;
