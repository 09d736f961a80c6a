/*!
 * Task state reporting.
 *
 * A run forms a tree of tasks (source, file, language, unit). Each node is a
 * `TaskScope` identified by its label path; scopes report state transitions
 * to a `TaskObserver`, which decides how to render them. The pipeline never
 * renders anything itself.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

/// State of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Progress { completed: usize, total: usize },
    /// Nothing to do, with the reason
    Skipped(String),
    Failed(String),
    /// Finished, with a short summary
    Done(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped(_) | Self::Failed(_) | Self::Done(_))
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Progress { completed, total } => write!(f, "translated {}/{}", completed, total),
            Self::Skipped(reason) => write!(f, "skipped ({})", reason),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Done(summary) => write!(f, "done ({})", summary),
        }
    }
}

/// A state transition of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    /// Labels from the root task down to this one
    pub path: Vec<String>,
    pub state: TaskState,
}

impl TaskEvent {
    pub fn label(&self) -> String {
        self.path.join(" > ")
    }
}

/// Receiver of task state transitions
pub trait TaskObserver: Send + Sync {
    fn on_event(&self, event: &TaskEvent);
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct NullObserver;

impl TaskObserver for NullObserver {
    fn on_event(&self, _event: &TaskEvent) {}
}

/// A node of the task tree
#[derive(Clone)]
pub struct TaskScope {
    path: Vec<String>,
    observer: Arc<dyn TaskObserver>,
}

impl fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScope").field("path", &self.path).finish()
    }
}

impl TaskScope {
    /// Create a root task
    pub fn root(label: impl Into<String>, observer: Arc<dyn TaskObserver>) -> Self {
        Self {
            path: vec![label.into()],
            observer,
        }
    }

    /// Root task whose events go nowhere
    pub fn detached(label: impl Into<String>) -> Self {
        Self::root(label, Arc::new(NullObserver))
    }

    /// Create a child task; it starts out pending
    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(label.into());
        let child = Self {
            path,
            observer: Arc::clone(&self.observer),
        };
        child.emit(TaskState::Pending);
        child
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn label(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn emit(&self, state: TaskState) {
        self.observer.on_event(&TaskEvent {
            path: self.path.clone(),
            state,
        });
    }

    pub fn running(&self) {
        self.emit(TaskState::Running);
    }

    pub fn progress(&self, completed: usize, total: usize) {
        self.emit(TaskState::Progress { completed, total });
    }

    pub fn skipped(&self, reason: impl Into<String>) {
        self.emit(TaskState::Skipped(reason.into()));
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.emit(TaskState::Failed(reason.into()));
    }

    pub fn done(&self, summary: impl Into<String>) {
        self.emit(TaskState::Done(summary.into()));
    }
}

/// Observer writing terminal transitions through the `log` facade
#[derive(Debug, Default)]
pub struct LogObserver;

impl TaskObserver for LogObserver {
    fn on_event(&self, event: &TaskEvent) {
        let label = event.label();
        match &event.state {
            TaskState::Pending => {}
            TaskState::Running | TaskState::Progress { .. } => debug!("{}: {}", label, event.state),
            TaskState::Skipped(_) => info!("{}: {}", label, event.state),
            TaskState::Failed(_) => error!("{}: {}", label, event.state),
            TaskState::Done(_) => info!("{}: {}", label, event.state),
        }
    }
}

/// Observer rendering one progress line per task with indicatif
pub struct ProgressObserver {
    multi_progress: MultiProgress,
    bars: Mutex<HashMap<Vec<String>, ProgressBar>>,
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix}{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{prefix}{spinner} [{bar:30}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    fn bar_for(&self, event: &TaskEvent) -> ProgressBar {
        let mut bars = self.bars.lock();
        bars.entry(event.path.clone())
            .or_insert_with(|| {
                let bar = self.multi_progress.add(ProgressBar::new(0));
                bar.set_style(Self::style());
                let depth = event.path.len().saturating_sub(1);
                bar.set_prefix(format!("{}{} ", "  ".repeat(depth), event.path.last().cloned().unwrap_or_default()));
                bar
            })
            .clone()
    }
}

impl TaskObserver for ProgressObserver {
    fn on_event(&self, event: &TaskEvent) {
        let bar = self.bar_for(event);
        match &event.state {
            TaskState::Pending => bar.set_message("pending"),
            TaskState::Running => bar.set_message("running"),
            TaskState::Progress { completed, total } => {
                bar.set_length(*total as u64);
                bar.set_position(*completed as u64);
                bar.set_message("translating");
            }
            TaskState::Skipped(reason) => bar.finish_with_message(format!("skipped ({})", reason)),
            TaskState::Failed(reason) => {
                warn!("{}: {}", event.label(), reason);
                bar.abandon_with_message(format!("failed: {}", reason));
            }
            TaskState::Done(summary) => bar.finish_with_message(summary.clone()),
        }
    }
}
