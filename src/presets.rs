//! Preset property paths - friendly labels for common render settings
//!
//! Rule editors offer these labels; the engine only ever sees the path.

use indexmap::IndexMap;
use std::sync::LazyLock;

static PRESETS: LazyLock<IndexMap<&'static str, &'static str>> = LazyLock::new(|| {
    IndexMap::from([
        ("Render Width", "renderWidth"),
        ("Render Height", "renderHeight"),
        ("Number of Lights", "lights.count"),
        ("Total Scene Polygons", "polycount.total"),
        ("Render Output Path", "rendOutputFilename"),
    ])
});

/// All presets as `(label, path)` pairs, in table order
pub fn presets() -> impl Iterator<Item = (&'static str, &'static str)> {
    PRESETS.iter().map(|(label, path)| (*label, *path))
}

/// Path for a preset label
pub fn preset_path(label: &str) -> Option<&'static str> {
    PRESETS.get(label).copied()
}

/// Label of the preset that maps to `path`, if any
pub fn preset_label(path: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(_, p)| **p == path)
        .map(|(label, _)| *label)
}

/// Turn editor input into a path: preset labels are replaced, anything
/// else is taken as a raw path.
pub fn resolve_target(input: &str) -> String {
    preset_path(input).unwrap_or(input).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        assert_eq!(preset_path("Render Width"), Some("renderWidth"));
        assert_eq!(preset_path("render width"), None);
        assert_eq!(preset_label("lights.count"), Some("Number of Lights"));
        assert_eq!(preset_label("$.name"), None);
    }

    #[test]
    fn test_resolve_target_passes_raw_paths_through() {
        assert_eq!(resolve_target("Render Output Path"), "rendOutputFilename");
        assert_eq!(resolve_target("renderers.current.name"), "renderers.current.name");
    }

    #[test]
    fn test_table_order() {
        let labels: Vec<_> = presets().map(|(label, _)| label).collect();
        assert_eq!(labels.first(), Some(&"Render Width"));
        assert_eq!(labels.len(), 5);
    }
}
