//! Scheduling core of the teamworks Gantt timeline: task model, dependency
//! validation, timeline projection and the edit controller, plus the stores
//! it talks to.

pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod model;
pub mod projection;
pub mod store;

pub use controller::{Action, EditController, ViewState};
pub use error::{StoreError, ValidationError};
