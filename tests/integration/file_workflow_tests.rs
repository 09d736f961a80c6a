/*!
 * End-to-end tests of the file translation pipeline
 */

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{Value, json};
use speranto::app_config::FileConfig;
use speranto::file_utils::FileManager;
use speranto::providers::mock::MockProvider;
use speranto::translation::{ConcurrencyPolicy, FileOutcome, FilePipeline, FileRunSummary, TaskScope, TaskState};

use crate::common::{self, RecordingObserver};

async fn run_pipeline(files: FileConfig, mock: &MockProvider, languages: &[&str], policy: ConcurrencyPolicy) -> FileRunSummary {
    common::init_logging();
    let owned: Vec<String> = languages.iter().map(|l| l.to_string()).collect();
    let sources = FileManager::discover_sources(&files, "en", &owned).unwrap();
    FilePipeline::new(files, common::translators(mock, languages), policy)
        .run(sources, &TaskScope::detached("files"))
        .await
}

async fn run_default(root: &Path, mock: &MockProvider) -> FileRunSummary {
    run_pipeline(common::file_config(root), mock, &["es"], ConcurrencyPolicy::default()).await
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn write_pretty(root: &Path, relative: &str, value: &Value) -> Result<()> {
    common::create_test_file(root, relative, &serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[tokio::test]
async fn test_new_json_file_should_be_translated_with_one_call_per_group() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/messages.json", r#"{"greeting":"Hello","nested":{"farewell":"Goodbye"}}"#)?;

    let mock = MockProvider::working();
    let summary = run_default(root, &mock).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(mock.request_count(), 2);
    assert_eq!(
        read_json(&root.join("out/es/messages.json")),
        json!({"greeting": "[translated] Hello", "nested": {"farewell": "[translated] Goodbye"}})
    );
    Ok(())
}

#[tokio::test]
async fn test_unchanged_source_should_not_call_the_model_or_touch_the_output() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    write_pretty(root, "src/messages.json", &json!({"nav": {"home": "Home", "about": "About"}}))?;
    write_pretty(root, "out/es/messages.json", &json!({"nav": {"home": "Inicio", "about": "Acerca de"}}))?;
    let before = fs::read_to_string(root.join("out/es/messages.json"))?;

    let mock = MockProvider::working();
    let summary = run_default(root, &mock).await;

    assert_eq!(mock.request_count(), 0);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(
        summary.report("messages.json", "es").map(|r| &r.outcome),
        Some(&FileOutcome::Skipped)
    );
    assert_eq!(fs::read_to_string(root.join("out/es/messages.json"))?, before);
    Ok(())
}

#[tokio::test]
async fn test_added_dotted_key_should_retranslate_only_its_group() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    write_pretty(
        root,
        "src/messages.json",
        &json!({"nav": {"home": "Home", "about": "About"}, "nav.contact": "Contact", "footer": {"legal": "Legal"}}),
    )?;
    write_pretty(
        root,
        "out/es/messages.json",
        &json!({"nav": {"home": "Inicio", "about": "Acerca de"}, "footer": {"legal": "Aviso legal"}}),
    )?;

    let mock = MockProvider::working().with_dictionary([
        ("Home", "Inicio"),
        ("About", "Acerca de"),
        ("Contact", "Contacto"),
    ]);
    let summary = run_default(root, &mock).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(mock.request_count(), 1);
    assert!(mock.prompts()[0].contains("nav.contact"));
    assert_eq!(
        read_json(&root.join("out/es/messages.json")),
        json!({
            "nav": {"home": "Inicio", "about": "Acerca de"},
            "nav.contact": "Contacto",
            "footer": {"legal": "Aviso legal"}
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_markdown_should_translate_list_with_context_and_skip_code() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(
        root,
        "src/guide.md",
        "# Guide\n\nRead this first.\n\n- one\n- two\n- three\n\n> Remember the basics.\n\n```sh\necho hi\n```\n",
    )?;

    let mock = MockProvider::working().with_custom_response(|s| s.to_uppercase());
    let summary = run_default(root, &mock).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(mock.request_count(), 1);
    assert!(mock.prompts().iter().all(|p| !p.contains("echo hi")));
    assert_eq!(
        fs::read_to_string(root.join("out/es/guide.md"))?,
        "# GUIDE\n\nREAD THIS FIRST.\n\n- ONE\n- TWO\n- THREE\n\n> REMEMBER THE BASICS.\n\n```sh\necho hi\n```\n\n\
         _Automatically translated from English using mock-model._\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_markdown_rerun_should_ignore_the_attribution_trailer() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/intro.md", "# Intro\n\nWelcome to the docs.\n")?;

    let first = MockProvider::working().with_custom_response(|s| s.to_uppercase());
    run_default(root, &first).await;
    let written = fs::read_to_string(root.join("out/es/intro.md"))?;
    assert_eq!(written.matches("_Automatically translated from").count(), 1);

    let second = MockProvider::working().with_custom_response(|s| s.to_uppercase());
    let summary = run_default(root, &second).await;
    assert_eq!(summary.skipped(), 1);
    assert_eq!(second.request_count(), 0);
    assert_eq!(fs::read_to_string(root.join("out/es/intro.md"))?, written);
    Ok(())
}

fn paragraphs(labels: &[&str]) -> String {
    let body = labels.iter().map(|l| format!("Paragraph {}.", l)).collect::<Vec<_>>().join("\n\n");
    format!("{}\n", body)
}

#[tokio::test]
async fn test_markdown_paragraph_inserted_at_top_should_be_translated_without_duplicates() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/story.md", &paragraphs(&["A", "B", "C", "D", "E"]))?;

    let first = MockProvider::working().with_custom_response(|s| s.to_lowercase());
    run_default(root, &first).await;

    common::create_test_file(root, "src/story.md", &paragraphs(&["NEW", "A", "B", "C", "D", "E"]))?;
    let second = MockProvider::working().with_custom_response(|s| s.to_lowercase());
    let summary = run_default(root, &second).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(second.request_count(), 2);
    let written = fs::read_to_string(root.join("out/es/story.md"))?;
    assert!(written.starts_with("paragraph new.\n\nparagraph a."));
    for label in ["new", "a", "b", "c", "d", "e"] {
        assert_eq!(written.matches(&format!("paragraph {}.", label)).count(), 1, "{}", label);
    }
    Ok(())
}

#[tokio::test]
async fn test_markdown_translation_with_merged_blocks_should_be_redone_on_rerun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let labels = ["0", "1", "2", "3", "4", "5", "6", "7", "8"];
    common::create_test_file(root, "src/story.md", &paragraphs(&labels))?;

    // every chunk comes back as a single paragraph
    let merging = MockProvider::working().with_custom_response(|s| s.to_lowercase().replace("\n\n", " "));
    run_default(root, &merging).await;
    let merged = fs::read_to_string(root.join("out/es/story.md"))?;
    assert!(merged.starts_with("paragraph 0. paragraph 1. paragraph 2. paragraph 3.\n\n"));

    let second = MockProvider::working().with_custom_response(|s| s.to_lowercase());
    let summary = run_default(root, &second).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(second.request_count(), 3);
    let written = fs::read_to_string(root.join("out/es/story.md"))?;
    assert!(written.starts_with(&paragraphs(&["0", "1", "2", "3", "4", "5", "6", "7", "8"]).to_lowercase()));
    for label in labels {
        assert_eq!(written.matches(&format!("paragraph {}.", label)).count(), 1, "{}", label);
    }
    Ok(())
}

#[tokio::test]
async fn test_failed_unit_should_gate_the_file_write() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/messages.json", r#"{"nav":{"home":"Home"},"footer":{"legal":"Broken"}}"#)?;
    common::create_test_file(root, "src/other.json", r#"{"title":"Fine"}"#)?;

    let mock = MockProvider::working().failing_on("Broken");
    let summary = run_default(root, &mock).await;

    assert!(summary.has_failures());
    assert_eq!(summary.failed(), 1);
    assert!(matches!(
        summary.report("messages.json", "es").map(|r| &r.outcome),
        Some(FileOutcome::Failed(_))
    ));
    assert!(!root.join("out/es/messages.json").exists());
    assert!(root.join("out/es/other.json").exists());
    assert_eq!(mock.request_count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_unparseable_source_should_fail_only_that_file() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/broken.json", "{ \"a\": ")?;
    common::create_test_file(root, "src/ok.json", r#"{"a":"A"}"#)?;

    let mock = MockProvider::working();
    let summary = run_pipeline(common::file_config(root), &mock, &["es", "fr"], ConcurrencyPolicy::default()).await;

    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.written(), 2);
    assert!(root.join("out/fr/ok.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_unparseable_existing_translation_should_be_replaced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/messages.json", r#"{"a":"A"}"#)?;
    common::create_test_file(root, "out/es/messages.json", "not json at all")?;

    let mock = MockProvider::working();
    let summary = run_default(root, &mock).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(read_json(&root.join("out/es/messages.json")), json!({"a": "[translated] A"}));
    Ok(())
}

#[tokio::test]
async fn test_retranslate_should_ignore_existing_output() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    write_pretty(root, "src/messages.json", &json!({"nav": {"home": "Home"}}))?;
    write_pretty(root, "out/es/messages.json", &json!({"nav": {"home": "Inicio"}}))?;

    common::init_logging();
    let files = common::file_config(root);
    let sources = FileManager::discover_sources(&files, "en", &["es".to_string()])?;
    let mock = MockProvider::working();
    let summary = FilePipeline::new(files, common::translators(&mock, &["es"]), ConcurrencyPolicy::default())
        .with_retranslate(true)
        .run(sources, &TaskScope::detached("files"))
        .await;

    assert_eq!(summary.written(), 1);
    assert_eq!(mock.request_count(), 1);
    assert_eq!(
        read_json(&root.join("out/es/messages.json")),
        json!({"nav": {"home": "[translated] Home"}})
    );
    Ok(())
}

#[tokio::test]
async fn test_javascript_module_should_keep_code_around_translated_strings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(
        root,
        "src/messages.js",
        "// strings\nexport default {\n  nav: { home: \"Home\" },\n  title: 'Docs',\n  count: 2,\n};\n",
    )?;

    let mock = MockProvider::working().with_dictionary([("Home", "Inicio"), ("Docs", "Documentación")]);
    let summary = run_default(root, &mock).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(
        fs::read_to_string(root.join("out/es/messages.js"))?,
        "// strings\nexport default {\n  nav: { home: \"Inicio\" },\n  title: 'Documentación',\n  count: 2,\n};\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_lang_code_file_names_should_not_be_picked_up_as_sources() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "locales/en.json", r#"{"hello":"Hello"}"#)?;

    let locales = root.join("locales");
    let mut files = FileConfig::new(&locales, locales.to_string_lossy().to_string());
    files.use_lang_code_as_filename = true;

    let mock = MockProvider::working();
    let first = run_pipeline(files.clone(), &mock, &["es", "de"], ConcurrencyPolicy::default()).await;
    assert_eq!(first.written(), 2);
    assert!(locales.join("es.json").exists());
    assert!(locales.join("de.json").exists());

    let second = run_pipeline(files, &mock, &["es", "de"], ConcurrencyPolicy::default()).await;
    assert_eq!(second.reports.len(), 2);
    assert_eq!(second.skipped(), 2);
    assert_eq!(mock.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_sequential_policy_should_send_one_request_at_a_time() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    for i in 0..4 {
        common::create_test_file(root, &format!("src/file{}.json", i), r#"{"a":{"x":"X"},"b":{"y":"Y"}}"#)?;
    }

    let mock = MockProvider::working().with_delay(Duration::from_millis(5));
    let summary = run_pipeline(common::file_config(root), &mock, &["es", "fr"], ConcurrencyPolicy::sequential()).await;

    assert_eq!(summary.written(), 8);
    assert_eq!(mock.request_count(), 16);
    assert_eq!(mock.max_in_flight(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_policy_should_overlap_requests() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let source: serde_json::Map<String, Value> = (0..6).map(|i| (format!("g{}", i), json!({"k": "v"}))).collect();
    write_pretty(root, "src/many.json", &Value::Object(source))?;

    let mock = MockProvider::working().with_delay(Duration::from_millis(20));
    let summary = run_pipeline(common::file_config(root), &mock, &["es"], ConcurrencyPolicy::new(3, false)).await;

    assert_eq!(summary.written(), 1);
    assert_eq!(mock.request_count(), 6);
    assert!(mock.max_in_flight() > 1);
    assert!(mock.max_in_flight() <= 3);
    Ok(())
}

#[tokio::test]
async fn test_task_events_should_report_skipped_languages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    write_pretty(root, "src/messages.json", &json!({"nav": {"home": "Home"}}))?;
    write_pretty(root, "out/es/messages.json", &json!({"nav": {"home": "Inicio"}}))?;

    let files = common::file_config(root);
    let sources = FileManager::discover_sources(&files, "en", &["es".to_string(), "fr".to_string()])?;
    let mock = MockProvider::working();
    let observer = Arc::new(RecordingObserver::default());
    FilePipeline::new(files, common::translators(&mock, &["es", "fr"]), ConcurrencyPolicy::default())
        .run(sources, &TaskScope::root("files", observer.clone()))
        .await;

    assert_eq!(
        observer.final_state(&["files", "messages.json", "es"]),
        Some(TaskState::Skipped("unchanged".to_string()))
    );
    assert!(matches!(
        observer.final_state(&["files", "messages.json", "fr"]),
        Some(TaskState::Done(_))
    ));
    assert!(matches!(observer.final_state(&["files"]), Some(TaskState::Done(_))));
    Ok(())
}
