//! Incremental polling.
//!
//! A [`engine::PollCycle`] turns a [`models::PollSource`] into one checkpointed fetch:
//! it assembles a query filtered on the stored high-water mark, hands every new
//! entity to an [`traits::EventSink`], and only then advances the checkpoint.
//! [`schedule::PollScheduler`] repeats that on an interval.

pub mod engine;
pub mod memory;
pub mod models;
pub mod schedule;
pub mod traits;
