/*!
 * Incremental translation of the units of one tree into one language.
 *
 * The orchestrator classifies source units against the units of the existing
 * translation, reuses what is unchanged, splits oversized changed units and
 * sends one request per dispatched unit with bounded concurrency. A failing
 * unit keeps its source values and is reported; its siblings carry on.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};

use crate::translation::change_detector::{self, Classification};
use crate::translation::concurrency::ConcurrencyPolicy;
use crate::translation::splitter;
use crate::translation::tasks::TaskScope;
use crate::translation::translator::Translator;
use crate::translation::unit::{TranslationResult, TranslationUnit};

/// Default maximum number of members in one key-value request
pub const DEFAULT_MAX_GROUP_SIZE: usize = 200;

/// A unit whose request failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub key: String,
    pub message: String,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing changed since the existing translation
    Skipped,
    /// Every changed unit was translated
    Completed,
    /// At least one unit failed; the output must not be written
    PartiallyFailed { failures: Vec<UnitFailure> },
}

/// Result of translating the units of one tree
#[derive(Debug, Clone)]
pub struct UnitRunReport {
    /// Value of every member keyed by identity
    pub result: TranslationResult,
    pub outcome: RunOutcome,
    /// Requests that succeeded
    pub translated: usize,
    /// Requests that were needed
    pub dispatched: usize,
}

impl UnitRunReport {
    pub fn is_skipped(&self) -> bool {
        self.outcome == RunOutcome::Skipped
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::PartiallyFailed { .. })
    }

    pub fn failures(&self) -> &[UnitFailure] {
        match &self.outcome {
            RunOutcome::PartiallyFailed { failures } => failures,
            _ => &[],
        }
    }
}

/// Translates the units of one tree with one translator
#[derive(Debug)]
pub struct UnitOrchestrator<'a> {
    translator: &'a Translator,
    policy: ConcurrencyPolicy,
    max_group_size: usize,
    retranslate: bool,
}

impl<'a> UnitOrchestrator<'a> {
    pub fn new(translator: &'a Translator, policy: ConcurrencyPolicy) -> Self {
        Self {
            translator,
            policy,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            retranslate: false,
        }
    }

    pub fn with_max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size;
        self
    }

    /// Translate every unit regardless of the existing translation
    pub fn with_retranslate(mut self, retranslate: bool) -> Self {
        self.retranslate = retranslate;
        self
    }

    /// Translate `source_units`, reusing `existing_units` where nothing changed
    ///
    /// Without an existing translation every unit counts as changed and the
    /// run is never skipped, even when there is nothing to send.
    pub async fn run(
        &self,
        source_units: &[TranslationUnit],
        existing_units: Option<&[TranslationUnit]>,
        scope: &TaskScope,
    ) -> UnitRunReport {
        let classification = match existing_units {
            Some(existing) if !self.retranslate => change_detector::classify(source_units, existing),
            _ => change_detector::classify_all_changed(source_units),
        };
        let existing_values: HashMap<&str, &str> = existing_units
            .unwrap_or_default()
            .iter()
            .flat_map(|unit| unit.members.iter())
            .map(|m| (m.identity.as_str(), m.source.as_str()))
            .collect();

        let mut result = reused_values(&classification, &existing_values);

        if !classification.has_changes() && existing_units.is_some() {
            debug!("{}: {} units unchanged", scope.label(), classification.unchanged.len());
            return UnitRunReport {
                result,
                outcome: RunOutcome::Skipped,
                translated: 0,
                dispatched: 0,
            };
        }

        // failed units keep their source values
        for unit in &classification.changed {
            result.extend(unit.members.iter().map(|m| (m.identity.clone(), m.source.clone())));
        }

        let dispatch: Vec<TranslationUnit> = splitter::split(classification.changed, self.max_group_size)
            .iter()
            .flat_map(|split| split.dispatch_units().into_iter().cloned())
            .collect();
        let total = dispatch.len();
        let completed = AtomicUsize::new(0);
        scope.running();
        scope.progress(0, total);

        let outcomes = self
            .policy
            .run_bounded(dispatch, |unit| {
                let completed = &completed;
                async move {
                    let outcome = self.translator.translate_unit(&unit).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    scope.progress(done, total);
                    (unit.key, outcome)
                }
            })
            .await;

        let mut failures = Vec::new();
        let mut translated = 0;
        for (key, outcome) in outcomes {
            match outcome {
                Ok(values) => {
                    translated += 1;
                    result.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                Err(e) => {
                    warn!("{}: unit '{}' failed: {}", scope.label(), key, e);
                    failures.push(UnitFailure {
                        key,
                        message: e.to_string(),
                    });
                }
            }
        }

        let outcome = if failures.is_empty() {
            RunOutcome::Completed
        } else {
            RunOutcome::PartiallyFailed { failures }
        };
        UnitRunReport {
            result,
            outcome,
            translated,
            dispatched: total,
        }
    }
}

/// Values of unchanged units: the existing translation, or the source when absent
fn reused_values(classification: &Classification, existing: &HashMap<&str, &str>) -> TranslationResult {
    classification
        .unchanged
        .iter()
        .flat_map(|unit| unit.members.iter())
        .map(|m| {
            let value = existing.get(m.identity.as_str()).copied().unwrap_or(m.source.as_str());
            (m.identity.clone(), value.to_string())
        })
        .collect()
}
