#![forbid(unsafe_code)]

//! Core domain model and computation for the adaptive energy and macro coach.
//!
//! This crate provides:
//! - Domain types (profile, activity blocks, metrics history, targets)
//! - Activity MET catalog
//! - Metabolic and exercise energy estimation
//! - Deficit controller (rate baseline, PID refinement, sleep cap)
//! - Macro composition and the energy-availability guard
//! - Daily planner, phase scheduler, next-day trend prediction
//! - Persistence (JSON store, JSONL intake and training-volume logs)
//! - Weekly per-muscle-group volume report

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod metabolic;
pub mod exercise;
pub mod history;
pub mod controller;
pub mod composer;
pub mod guard;
pub mod planner;
pub mod schedule;
pub mod trend;
pub mod store;
pub mod intake;
pub mod volume;
mod jsonl;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use composer::{Suggestion, SuggestionKind};
pub use guard::EaStatus;
pub use planner::{plan_day, PlanRequest, PlanResult};
pub use schedule::{schedule, SchedulePattern, ScheduledDay};
pub use trend::{predict_next_day, Band, Prediction};
pub use store::{DailyStore, JsonStore};
pub use intake::{IntakeSink, JsonlIntakeLog};
pub use volume::{JsonlVolumeLog, VolumeAdvice, VolumeSink};
