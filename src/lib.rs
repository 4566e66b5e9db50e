//! Recurring chore scheduling for shared households.
//!
//! Templates describe a chore's cadence ([`models::Frequency`]) and who does
//! it ([`models::Assignment`]). [`projection`] turns a template into calendar
//! dates for display; [`generation`] materializes the next task and advances
//! the rotation. Neither schedules itself: callers decide when to generate.

pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod models;
pub mod projection;
pub mod repository;
pub mod rotation;
pub mod storage;
pub mod tui;

pub use error::{ScheduleError, ValidationError};
pub use generation::{generate, Generation, GenerationPolicy, GenerationRequest};
pub use storage::JsonStore;
