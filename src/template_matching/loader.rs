//! Template library loading from image directories

use super::config::MatchConfig;
use super::matcher::to_grayscale;
use super::types::{Template, TemplateLibrary};
use crate::error::{ScanError, ScanResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files of a directory, sorted by path
fn image_files(directory: &Path) -> ScanResult<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(ScanError::TemplateDirectoryMissing {
            path: directory.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(directory).map_err(|source| ScanError::TemplateDirectoryUnreadable {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn load_template(path: &Path) -> ScanResult<Template> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ScanError::TemplateUnreadable {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;

    let image = image::open(path).map_err(|e| ScanError::TemplateUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(Template::new(name, to_grayscale(&image)))
}

/// Load every image of `directory`, keyed by file stem
///
/// A missing directory or an unreadable image is an error; a directory without images
/// yields an empty map.
pub fn load_directory(directory: &Path) -> ScanResult<BTreeMap<String, Template>> {
    let mut templates = BTreeMap::new();
    for path in image_files(directory)? {
        let template = load_template(&path)?;
        log::debug!(
            "📄 Loaded template '{}' ({}x{})",
            template.name,
            template.width(),
            template.height()
        );
        templates.insert(template.name.clone(), template);
    }
    Ok(templates)
}

/// Load one template category and apply per-template overrides
///
/// An empty category is an error: detection without templates would silently find nothing.
pub fn load_library(directory: &Path, config: &MatchConfig) -> ScanResult<TemplateLibrary> {
    let library: TemplateLibrary = load_directory(directory)?
        .into_values()
        .map(|t| config.configure(t))
        .collect();

    if library.is_empty() {
        return Err(ScanError::EmptyTemplateCategory {
            path: directory.to_path_buf(),
        });
    }

    log::info!(
        "📚 Loaded {} templates from {}",
        library.len(),
        directory.display()
    );
    Ok(library)
}

/// Load the templates of `directory` whose file stem starts with `prefix`
///
/// Used for marker families such as `dragon*.png`. Returns an empty library when none match.
pub fn load_prefixed(directory: &Path, prefix: &str) -> ScanResult<TemplateLibrary> {
    let prefix = prefix.to_lowercase();
    let mut library = TemplateLibrary::new();
    for path in image_files(directory)? {
        let matches_prefix = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase().starts_with(&prefix))
            .unwrap_or(false);
        if matches_prefix {
            library.insert(load_template(&path)?);
        }
    }
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, 90, 255])
        });
        image.save(dir.join(name)).expect("write test png");
    }

    #[test]
    fn test_load_directory_keys_by_stem() {
        let dir = TempDir::new().expect("tempdir");
        write_png(dir.path(), "haemon.png", 12, 14);
        write_png(dir.path(), "stror.PNG", 16, 16);
        std::fs::write(dir.path().join("notes.txt"), "not an image").expect("write txt");

        let templates = load_directory(dir.path()).expect("load");
        assert_eq!(
            templates.keys().cloned().collect::<Vec<_>>(),
            vec!["haemon".to_string(), "stror".to_string()]
        );
        assert_eq!(templates["haemon"].width(), 12);
        assert_eq!(templates["haemon"].height(), 14);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let result = load_directory(&dir.path().join("absent"));
        assert!(matches!(result, Err(ScanError::TemplateDirectoryMissing { .. })));
    }

    #[test]
    fn test_unreadable_image_is_error() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("broken.png"), b"not a png").expect("write");
        let result = load_directory(dir.path());
        assert!(
            matches!(result, Err(ScanError::TemplateUnreadable { .. })),
            "Corrupt template must fail loading, got {:?}",
            result.map(|t| t.len())
        );
    }

    #[test]
    fn test_empty_category_is_error() {
        let dir = TempDir::new().expect("tempdir");
        let result = load_library(dir.path(), &MatchConfig::default());
        assert!(matches!(result, Err(ScanError::EmptyTemplateCategory { .. })));
    }

    #[test]
    fn test_library_applies_config() {
        let dir = TempDir::new().expect("tempdir");
        write_png(dir.path(), "aurora.png", 12, 12);
        write_png(dir.path(), "farhad.png", 12, 12);

        let mut config = MatchConfig::default();
        config.custom_thresholds.insert("aurora".to_string(), 0.9);
        config.disabled_templates.insert("farhad".to_string());

        let library = load_library(dir.path(), &config).expect("load");
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("aurora").and_then(|t| t.threshold), Some(0.9));
        assert_eq!(library.enabled().count(), 1);
    }

    #[test]
    fn test_load_prefixed_family() {
        let dir = TempDir::new().expect("tempdir");
        write_png(dir.path(), "dragon.png", 12, 12);
        write_png(dir.path(), "Dragon_2.png", 12, 12);
        write_png(dir.path(), "haemon.png", 12, 12);

        let library = load_prefixed(dir.path(), "dragon").expect("load");
        assert_eq!(library.names(), vec!["Dragon_2".to_string(), "dragon".to_string()]);
    }
}
