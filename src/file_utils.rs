use anyhow::{Context, Result};
use log::debug;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::app_config::FileConfig;
use crate::language_utils;
use crate::parsers::ContentFormat;

// @module: File and directory utilities

/// A file found under the source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as found on disk
    pub path: PathBuf,
    /// Path relative to the source directory
    pub relative: PathBuf,
    pub format: ContentFormat,
}

impl SourceFile {
    pub fn new(source_dir: &Path, path: PathBuf, format: ContentFormat) -> Self {
        let relative = path.strip_prefix(source_dir).map(Path::to_path_buf).unwrap_or_else(|_| {
            path.file_name().map(PathBuf::from).unwrap_or_else(|| path.clone())
        });
        Self { path, relative, format }
    }

    /// Label used in progress output
    pub fn label(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @generates: Output path of a source file for a language
    // @params: files config, source file, target language
    pub fn output_path(files: &FileConfig, source: &SourceFile, language: &str) -> PathBuf {
        let mut output = files.target_dir_for(language).join(&source.relative);
        if files.use_lang_code_as_filename {
            let file_name = match source.path.extension() {
                Some(ext) => format!("{}.{}", language, ext.to_string_lossy()),
                None => language.to_string(),
            };
            output.set_file_name(file_name);
        }
        output
    }

    /// Find every translatable file under the source directory
    ///
    /// Files inside a resolved target directory are skipped. When outputs are
    /// named by language code, a file named after any language other than
    /// `source_language` is skipped too, current target or not.
    pub fn discover_sources(files: &FileConfig, source_language: &str, languages: &[String]) -> Result<Vec<SourceFile>> {
        let source_dir = &files.source_dir;
        if !Self::dir_exists(source_dir) {
            return Err(anyhow::anyhow!("Source directory does not exist: {:?}", source_dir));
        }

        let source_key = normalize(source_dir);
        let target_dirs: Vec<PathBuf> = languages
            .iter()
            .map(|lang| normalize(&files.target_dir_for(lang)))
            .filter(|dir| !source_key.starts_with(dir))
            .collect();

        let mut result = Vec::new();
        for entry in WalkDir::new(source_dir).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(format) = ContentFormat::from_path(path) else {
                continue;
            };

            let key = normalize(path);
            if target_dirs.iter().any(|dir| key.starts_with(dir)) {
                debug!("Skipping {:?}: inside a target directory", path);
                continue;
            }
            if files.use_lang_code_as_filename && Self::is_other_language_file(path, source_language) {
                debug!("Skipping {:?}: named after another language", path);
                continue;
            }

            result.push(SourceFile::new(source_dir, path.to_path_buf(), format));
        }

        Ok(result)
    }

    fn is_other_language_file(path: &Path, source_language: &str) -> bool {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            return false;
        };
        language_utils::is_language_code(&stem)
            && !source_language.eq_ignore_ascii_case(&stem)
            && !language_utils::language_codes_match(source_language, &stem)
    }

    /// Read a file if it exists
    pub async fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read file: {:?}", path)),
        }
    }

    /// Write a string to a file without blocking the runtime
    pub async fn write_async<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write to file: {:?}", path))
    }
}

/// Lexically normalized path for prefix comparison
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
