//! SceneLint - a pre-render checklist engine
//!
//! Folders of inspection rules are evaluated against a host scene through a
//! [`PropertyResolver`]; failed rules are reported with optional fix actions.

pub mod config;
pub mod document;
pub mod presets;
pub mod resolver;
pub mod rules;

pub use config::Config;
pub use document::DocumentError;
pub use resolver::{PropertyResolver, Value};
pub use rules::{ChecklistRunner, Condition, Folder, Rule, RuleNode, RuleTree};

use std::path::{Path, PathBuf};

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Write `content` to `path` under an exclusive advisory lock.
///
/// The lock is a sibling file with `.lock` appended to the extension
/// (`rules.json` locks `rules.json.lock`). Parent directories are created.
pub(crate) fn write_locked(path: &Path, content: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use fs2::FileExt;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let lock_path = match path.extension() {
        Some(ext) => path.with_extension(format!("{}.lock", ext.to_string_lossy())),
        None => path.with_extension("lock"),
    };
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| format!("Failed to lock {}", path.display()))?;

    let result = std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()));
    let _ = lock_file.unlock();
    result
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
