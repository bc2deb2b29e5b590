//! Ports module (Hexagonal Architecture)
//!
//! Interfaces the domain needs from the outside world.

pub mod outbound;

pub use outbound::*;
