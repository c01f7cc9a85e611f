//! Blind-signed auth token models consumed by the cache.

pub mod token;

pub use token::{secret::*, *};
