//! Shared data model and HTTP body definitions for `TaskSteer`.

pub mod api;
pub mod list;
pub mod task;
