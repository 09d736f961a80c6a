/*!
 * Tests for file utility functions
 */

use std::path::PathBuf;

use anyhow::Result;
use speranto::app_config::FileConfig;
use speranto::file_utils::FileManager;
use speranto::parsers::ContentFormat;

use crate::common;

#[test]
fn test_file_exists_with_existing_file_should_return_true() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.json", "{}")?;
    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.json")));
    Ok(())
}

#[test]
fn test_discover_sources_should_find_all_formats_recursively() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/a.md", "# A")?;
    common::create_test_file(root, "src/nested/b.json", "{}")?;
    common::create_test_file(root, "src/nested/c.js", "export default {};")?;
    common::create_test_file(root, "src/nested/d.ts", "export default {};")?;
    common::create_test_file(root, "src/image.png", "")?;

    let found = FileManager::discover_sources(&common::file_config(root), "en", &["es".to_string()])?;
    let formats: Vec<(String, ContentFormat)> = found.iter().map(|s| (s.label(), s.format)).collect();
    assert_eq!(
        formats,
        vec![
            ("a.md".to_string(), ContentFormat::Markdown),
            ("nested/b.json".to_string(), ContentFormat::Json),
            ("nested/c.js".to_string(), ContentFormat::JavaScript),
            ("nested/d.ts".to_string(), ContentFormat::TypeScript),
        ]
    );
    Ok(())
}

#[test]
fn test_discover_sources_with_missing_directory_should_fail() {
    let files = FileConfig::new("/definitely/not/here", "/tmp/[lang]");
    assert!(FileManager::discover_sources(&files, "en", &["es".to_string()]).is_err());
}

#[test]
fn test_discover_sources_should_scan_source_inside_target_pattern() -> Result<()> {
    // content/en is both the source and the "en" output directory
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "content/en/intro.md", "# Intro")?;
    common::create_test_file(root, "content/es/intro.md", "# Intro")?;

    let files = FileConfig::new(
        root.join("content/en"),
        root.join("content/[lang]").to_string_lossy().to_string(),
    );
    let found = FileManager::discover_sources(&files, "en", &["en".to_string(), "es".to_string()])?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].relative, PathBuf::from("intro.md"));
    Ok(())
}

#[tokio::test]
async fn test_write_async_should_create_parent_directories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out/es/deep/file.json");
    FileManager::write_async(&path, "{}").await?;
    assert_eq!(FileManager::read_optional(&path).await?, Some("{}".to_string()));
    Ok(())
}
