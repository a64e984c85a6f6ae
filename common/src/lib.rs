// Common library for shared code across the api and scheduler binaries

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod db;
pub mod errors;
pub mod mentions;
pub mod models;
pub mod notifier;
pub mod schedule;
pub mod scheduler;
pub mod signature;
pub mod telemetry;
