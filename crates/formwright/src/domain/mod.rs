//! Domain Layer
//!
//! Pure form-building and form-filling logic. Nothing here touches storage.

pub mod aggregates;
pub mod events;
pub mod services;
pub mod value_objects;

pub use events::SessionEvent;
