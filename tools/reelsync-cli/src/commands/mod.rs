pub mod analyze;
pub mod config;
pub mod layout;
pub mod move_clip;
pub mod slice;
pub mod validate;

use std::path::Path;

use reelsync_common::ReelsyncError;
use reelsync_project_model::project::Project;

/// Load a project file.
pub fn load_project(path: &Path) -> anyhow::Result<Project> {
    if !path.exists() {
        return Err(ReelsyncError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(Project::load(path).map_err(|e| ReelsyncError::project(e.to_string()))?)
}

/// Directory that relative telemetry paths resolve against.
pub fn project_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Print a value to stdout as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
