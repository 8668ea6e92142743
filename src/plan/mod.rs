// src/plan/mod.rs

//! Deployment plan files.
//!
//! - [`model`]: the TOML-backed data model and its [`Resource`](crate::resource::Resource)
//!   materialisation.
//! - [`loader`]: reading a plan from disk.
//! - [`validate`]: semantic checks applied when turning a raw plan into a
//!   [`PlanFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_plan_path, load_and_validate, load_from_path};
pub use model::{DeploySection, PlanFile, PlanResource, RawPlanFile, ResourceConfig};
