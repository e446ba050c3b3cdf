use anyhow::{Context, Result};
use interview_core::Directives;
use std::fs;
use std::path::Path;

/// Applies every `<directive>.md` file in `dir_path` on top of the built-in
/// directives. A missing directory leaves the defaults untouched; files that
/// don't name a directive are skipped.
pub fn load_directives(dir_path: &Path) -> Result<Directives> {
    let mut directives = Directives::default();
    if !dir_path.exists() {
        tracing::debug!("No prompts directory at {}, using built-in directives", dir_path.display());
        return Ok(directives);
    }

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
            let content = content.trim();
            if content.is_empty() {
                tracing::warn!("Ignoring empty prompt file {}", path.display());
                continue;
            }

            if directives.set(&key, content.to_string()) {
                tracing::info!("Loaded '{}' directive from {}", key, path.display());
            } else {
                tracing::debug!("Skipping unrecognised prompt file {}", path.display());
            }
        }
    }

    Ok(directives)
}
