// src/plan/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::plan::model::{PlanFile, RawPlanFile};

/// Read and deserialize a plan without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let plan: RawPlanFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), resources = plan.resource.len(), "plan file parsed");

    Ok(plan)
}

/// Read a plan and validate it: unknown or self references in `after`,
/// cycles, missing type settings, keys colliding by case.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw_plan = load_from_path(&path)?;
    let plan = PlanFile::try_from(raw_plan)?;
    Ok(plan)
}

/// `Deploy.toml` in the current working directory.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("Deploy.toml")
}
