//! Infrastructure Layer
//!
//! Adapters for the outbound ports.

pub mod persistence;
