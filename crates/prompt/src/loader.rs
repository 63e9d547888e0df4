//! Template import from YAML files.

use crate::types::TemplateDraft;
use promptsmith_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Load and validate a single template file.
///
/// # Example
/// ```no_run
/// use promptsmith_prompt::load_template_file;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let draft = load_template_file(Path::new("templates/summary.yml"))?;
/// println!("Loaded template: {}", draft.name);
/// # Ok(())
/// # }
/// ```
pub fn load_template_file(path: &Path) -> AppResult<TemplateDraft> {
    tracing::debug!("Loading template from: {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read template file {:?}: {}", path, e),
        ))
    })?;

    let draft: TemplateDraft = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Serialization(format!("Failed to parse template YAML {:?}: {}", path, e))
    })?;

    draft.validate().map_err(|e| match e {
        AppError::Validation(msg) => AppError::Validation(format!("{:?}: {}", path, msg)),
        other => other,
    })?;

    tracing::info!("Loaded template: {} ({})", draft.name, draft.category);

    Ok(draft)
}

/// Template files (`*.yml`, `*.yaml`) directly inside `dir`, sorted by path.
pub fn list_template_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Template directory not found: {:?}",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|s| s.to_str()),
                    Some("yml") | Some("yaml")
                )
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Load every template file in `dir`.
///
/// Stops at the first invalid file so nothing is half-imported.
pub fn load_template_dir(dir: &Path) -> AppResult<Vec<TemplateDraft>> {
    list_template_files(dir)?
        .iter()
        .map(|path| load_template_file(path))
        .collect()
}
