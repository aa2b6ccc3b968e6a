//! Project spec loading.
//!
//! The core trusts the loaded spec structurally: serde enforces the
//! schema, and graph construction later rejects unknown or cyclic
//! dependency references.

use std::path::Path;

use super::ProjectSpec;

/// Loads a project spec from a YAML file.
///
/// # Errors
///
/// Returns an error string if the file cannot be read or parsed.
pub fn load_project_spec(path: &Path) -> Result<ProjectSpec, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read project spec {}: {e}", path.display()))?;
    serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse project spec {}: {e}", path.display()))
}
