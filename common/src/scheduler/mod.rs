// Scheduler module for weekly rotation ticks

pub mod advancer;
pub mod engine;

pub use advancer::{announcement_text, AdvanceReport, AdvancerConfig, RotationAdvancer};
pub use engine::{Scheduler, SchedulerEngine};
