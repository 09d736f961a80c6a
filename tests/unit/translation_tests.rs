/*!
 * Tests for change detection, splitting, the translator and the orchestrator
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use speranto::errors::{ProviderError, TranslationError};
use speranto::providers::mock::MockProvider;
use speranto::translation::change_detector::classify;
use speranto::translation::splitter::{SplitUnit, split};
use speranto::translation::{
    ConcurrencyPolicy, RunOutcome, TaskScope, TaskState, TranslationUnit, Translator, TranslatorSettings,
    UnitMember, UnitOrchestrator,
};

use crate::common::{self, RecordingObserver};

fn unit(key: &str, members: &[(&str, &str)]) -> TranslationUnit {
    TranslationUnit::key_value(
        key,
        members
            .iter()
            .map(|(id, v)| UnitMember::new(id.split('.').map(String::from).collect(), *id, *v))
            .collect(),
    )
}

fn translator(mock: &MockProvider) -> Translator {
    Translator::new(Arc::new(mock.clone()), &TranslatorSettings::new("en", 0.0), "es")
}

#[test]
fn test_classify_should_flag_units_missing_from_existing_translation() {
    let source = vec![unit("nav", &[("nav.home", "Home")]), unit("footer", &[("footer.legal", "Legal")])];
    let existing = vec![unit("nav", &[("nav.home", "Inicio")])];

    let classification = classify(&source, &existing);
    assert_eq!(classification.unchanged.len(), 1);
    assert_eq!(classification.changed.len(), 1);
    assert_eq!(classification.changed[0].key, "footer");
}

#[test]
fn test_classify_should_flag_renamed_member_with_same_count() {
    let source = vec![unit("nav", &[("nav.home", "Home"), ("nav.contact", "Contact")])];
    let existing = vec![unit("nav", &[("nav.home", "Inicio"), ("nav.about", "Acerca de")])];
    assert!(classify(&source, &existing).has_changes());
}

#[test]
fn test_split_should_bucket_by_second_key_segment() {
    let members: Vec<(String, String)> = ["docs.intro.title", "docs.intro.body", "docs.api.title", "docs.api.body"]
        .iter()
        .map(|id| (id.to_string(), "text".to_string()))
        .collect();
    let refs: Vec<(&str, &str)> = members.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();

    let parts = split(vec![unit("docs", &refs)], 3);
    assert_eq!(parts.len(), 1);
    match &parts[0] {
        SplitUnit::Split { parts, .. } => {
            assert_eq!(parts.len(), 2);
            assert!(parts.iter().all(|p| p.members.len() == 2));
        }
        SplitUnit::Whole(_) => panic!("unit should have been split"),
    }
}

#[tokio::test]
async fn test_translator_should_check_model_once_for_many_units() -> Result<()> {
    let mock = MockProvider::working();
    let translator = translator(&mock);
    for key in ["a", "b", "c"] {
        translator.translate_unit(&unit(key, &[(&format!("{}.x", key), "Text")])).await?;
    }
    assert_eq!(mock.load_check_count(), 1);
    assert_eq!(mock.request_count(), 3);
    assert_eq!(translator.usage().requests, 3);
    assert!(translator.usage().total_tokens() > 0);
    Ok(())
}

#[tokio::test]
async fn test_translator_with_unavailable_model_should_fail_without_requests() {
    let mock = MockProvider::working().with_model_unavailable();
    let result = translator(&mock).translate_unit(&unit("a", &[("a.x", "Text")])).await;
    assert!(matches!(
        result,
        Err(TranslationError::Provider(ProviderError::ModelUnavailable(_)))
    ));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_translator_should_never_send_blank_units() -> Result<()> {
    let mock = MockProvider::working();
    let result = translator(&mock).translate_unit(&unit("a", &[("a.x", "  "), ("a.y", "")])).await?;
    assert_eq!(result.get("a.x"), Some("  "));
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_translator_should_reject_empty_and_malformed_answers() {
    let empty = translator(&MockProvider::empty()).translate_unit(&unit("a", &[("a.x", "Text")])).await;
    assert!(matches!(empty, Err(TranslationError::EmptyResponse(_))));

    let malformed = translator(&MockProvider::malformed())
        .translate_unit(&unit("a", &[("a.x", "Text")]))
        .await;
    assert!(matches!(malformed, Err(TranslationError::Parse(_))));
}

#[tokio::test]
async fn test_translator_should_add_language_instructions_to_prompts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "es.md", "Use the informal tú form.")?;

    let mock = MockProvider::working();
    let settings = TranslatorSettings::new("en", 0.0).with_instructions_dir(Some(temp_dir.path().to_path_buf()));
    let translator = Translator::new(Arc::new(mock.clone()), &settings, "es");
    translator.translate_unit(&unit("a", &[("a.x", "Hello")])).await?;

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Use the informal tú form."));
    assert!(prompts[0].contains("Spanish"));
    Ok(())
}

#[tokio::test]
async fn test_orchestrator_should_not_retranslate_value_only_changes() {
    let mock = MockProvider::working();
    let translator = translator(&mock);
    let source = vec![unit("nav", &[("nav.home", "Homepage")])];
    let existing = vec![unit("nav", &[("nav.home", "Inicio")])];

    let report = UnitOrchestrator::new(&translator, ConcurrencyPolicy::default())
        .run(&source, Some(&existing), &TaskScope::detached("test"))
        .await;

    assert!(report.is_skipped());
    assert_eq!(report.result.get("nav.home"), Some("Inicio"));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_orchestrator_should_reuse_unchanged_units_and_translate_changed_ones() {
    let mock = MockProvider::working();
    let translator = translator(&mock);
    let source = vec![unit("nav", &[("nav.home", "Home")]), unit("footer", &[("footer.legal", "Legal")])];
    let existing = vec![unit("nav", &[("nav.home", "Inicio")])];

    let report = UnitOrchestrator::new(&translator, ConcurrencyPolicy::default())
        .run(&source, Some(&existing), &TaskScope::detached("test"))
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.result.get("nav.home"), Some("Inicio"));
    assert_eq!(report.result.get("footer.legal"), Some("[translated] Legal"));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_orchestrator_should_respect_sequential_policy() {
    let mock = MockProvider::working().with_delay(Duration::from_millis(10));
    let translator = translator(&mock);
    let source: Vec<TranslationUnit> = (0..5)
        .map(|i| {
            let key = format!("k{}", i);
            let id = format!("{}.x", key);
            unit(&key, &[(id.as_str(), "Text")])
        })
        .collect();

    let report = UnitOrchestrator::new(&translator, ConcurrencyPolicy::sequential())
        .run(&source, None, &TaskScope::detached("test"))
        .await;

    assert!(report.is_success());
    assert_eq!(mock.request_count(), 5);
    assert_eq!(mock.max_in_flight(), 1);
}

#[tokio::test]
async fn test_orchestrator_should_report_unit_progress() {
    let mock = MockProvider::working();
    let translator = translator(&mock);
    let observer = Arc::new(RecordingObserver::default());
    let scope = TaskScope::root("es", observer.clone());
    let source = vec![unit("a", &[("a.x", "One")]), unit("b", &[("b.x", "Two")])];

    UnitOrchestrator::new(&translator, ConcurrencyPolicy::default())
        .run(&source, None, &scope)
        .await;

    let progress: Vec<TaskState> = observer
        .events()
        .into_iter()
        .map(|e| e.state)
        .filter(|s| matches!(s, TaskState::Progress { .. }))
        .collect();
    assert_eq!(progress.last(), Some(&TaskState::Progress { completed: 2, total: 2 }));
}
