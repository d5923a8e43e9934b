use std::path::{Path, PathBuf};

/// Locates a detector model on disk.
///
/// Resolution order:
/// 1. Explicit path (must exist)
/// 2. User model directory (platform-specific)
/// 3. Bundled `models/` directory next to the working directory
pub fn resolve(explicit: Option<&Path>, name: &str, bundled_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        log::warn!("Model file {} does not exist", path.display());
        return None;
    }

    if let Some(dir) = model_dir() {
        let cached = dir.join(name);
        if cached.is_file() {
            return Some(cached);
        }
    }

    let bundled = bundled_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("models"))
        .join(name);
    bundled.is_file().then_some(bundled)
}

/// Platform-specific model directory.
///
/// - macOS: `~/Library/Application Support/Sortline/models/`
/// - Linux: `$XDG_CACHE_HOME/Sortline/models/` or `~/.cache/Sortline/models/`
/// - Windows: `%LOCALAPPDATA%/Sortline/models/`
pub fn model_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir().map(|d| d.join("Sortline").join("models"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir().map(|d| d.join("Sortline").join("models"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_existing_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("custom.onnx");
        std::fs::write(&model, b"onnx").unwrap();
        assert_eq!(resolve(Some(&model), "material_yolo.onnx", None), Some(model));
    }

    #[test]
    fn test_explicit_missing_path_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("absent.onnx");
        assert_eq!(resolve(Some(&model), "material_yolo.onnx", None), None);
    }

    #[test]
    fn test_bundled_dir_is_searched() {
        let dir = tempfile::tempdir().unwrap();
        let name = "sortline_resolver_test_model.onnx";
        std::fs::write(dir.path().join(name), b"onnx").unwrap();
        assert_eq!(
            resolve(None, name, Some(dir.path())),
            Some(dir.path().join(name))
        );
    }
}
