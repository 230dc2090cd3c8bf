//! Mirror host rotation and health tracking.

mod health;
mod registry;

pub use health::{CircuitBreaker, MirrorHealth};
pub use registry::{Mirror, MirrorRegistry};
