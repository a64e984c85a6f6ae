// Repository layer for database operations

pub mod rotation;

pub use rotation::{Announce, RotationRepository, RotationStore};
