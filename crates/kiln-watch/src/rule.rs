//! Watch rules and their rebuild queues.

use std::path::{Path, PathBuf};

use kiln_tasks::Step;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::WatchError;
use crate::debouncer::FsEventKind;
use crate::globs::GlobSet;

/// Which event kinds a rule reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Created, modified and removed files.
    All,
    /// Modified files only.
    ModifyOnly,
}

impl EventFilter {
    pub(crate) fn accepts(self, kind: FsEventKind) -> bool {
        match self {
            Self::All => true,
            Self::ModifyOnly => kind == FsEventKind::Modified,
        }
    }
}

/// What a rule does when it fires.
#[derive(Clone)]
pub enum WatchAction {
    /// Re-run a step.
    Run(Step),
    /// Tell connected browsers to reload.
    Reload,
}

/// Maps matching filesystem changes to an action.
#[derive(Clone)]
pub struct WatchRule {
    name: String,
    globs: GlobSet,
    filter: EventFilter,
    action: WatchAction,
}

impl WatchRule {
    /// Create a rule.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] if a glob is invalid.
    pub fn new(
        name: impl Into<String>,
        globs: &[String],
        filter: EventFilter,
        action: WatchAction,
    ) -> Result<Self, WatchError> {
        Ok(Self {
            name: name.into(),
            globs: GlobSet::new(globs)?,
            filter,
            action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &WatchAction {
        &self.action
    }

    /// Directories the rule needs watched, relative to the project root.
    pub fn roots(&self) -> &[PathBuf] {
        self.globs.roots()
    }

    pub(crate) fn matches(&self, kind: FsEventKind, relative: &Path) -> bool {
        self.filter.accepts(kind) && self.globs.matches(relative)
    }
}

/// Serializes runs of one rule's step.
///
/// At most one run is in flight and at most one is pending. Triggers that
/// arrive while a run is pending are folded into it.
pub(crate) struct RebuildQueue {
    name: String,
    tx: mpsc::Sender<()>,
}

impl RebuildQueue {
    /// Spawn the worker that runs `step` for each queued trigger.
    pub(crate) fn spawn(name: &str, step: Step) -> Self {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let worker_name = name.to_owned();

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tracing::debug!(rule = %worker_name, state = "rebuilding");
                if let Err(err) = step.run().await {
                    tracing::warn!(
                        rule = %worker_name,
                        error = %err,
                        "Rebuild failed, still watching"
                    );
                }
                tracing::debug!(rule = %worker_name, state = "idle");
            }
        });

        Self {
            name: name.to_owned(),
            tx,
        }
    }

    /// Queue a run. Returns `false` when it was folded into a pending one.
    pub(crate) fn trigger(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                tracing::debug!(rule = %self.name, "Rebuild already pending");
                false
            }
            Err(TrySendError::Closed(())) => {
                tracing::warn!(rule = %self.name, "Rebuild worker stopped");
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::GatedTask;
    use super::*;
    use kiln_tasks::{Task, TaskError};
    use std::sync::Arc;
    use std::time::Duration;

    fn rule(globs: &[&str], filter: EventFilter) -> WatchRule {
        let globs: Vec<String> = globs.iter().map(|g| (*g).to_owned()).collect();
        WatchRule::new("test", &globs, filter, WatchAction::Reload).unwrap()
    }

    #[test]
    fn test_modify_only_filter() {
        let pages = rule(&["app/**/*.html"], EventFilter::ModifyOnly);
        let page = Path::new("app/index.html");

        assert!(pages.matches(FsEventKind::Modified, page));
        assert!(!pages.matches(FsEventKind::Created, page));
        assert!(!pages.matches(FsEventKind::Removed, page));
    }

    #[test]
    fn test_all_filter() {
        let styles = rule(&["app/scss/**/*.scss"], EventFilter::All);
        let partial = Path::new("app/scss/_vars.scss");

        assert!(styles.matches(FsEventKind::Created, partial));
        assert!(styles.matches(FsEventKind::Modified, partial));
        assert!(styles.matches(FsEventKind::Removed, partial));
        assert!(!styles.matches(FsEventKind::Modified, Path::new("app/index.html")));
    }

    #[tokio::test]
    async fn test_queue_keeps_one_pending_run() {
        let task = Arc::new(GatedTask::new(false));
        let queue = RebuildQueue::spawn("styles", Step::Task(Arc::clone(&task) as Arc<dyn Task>));

        assert!(queue.trigger());
        task.started.notified().await;

        // First run is in flight; one slot for the next
        assert!(queue.trigger());
        assert!(!queue.trigger());
        assert!(!queue.trigger());

        task.gate.add_permits(2);
        task.started.notified().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(task.runs(), 2);
    }

    #[tokio::test]
    async fn test_queue_survives_failed_run() {
        struct Failing;

        #[async_trait::async_trait]
        impl Task for Failing {
            fn name(&self) -> &str {
                "failing"
            }

            async fn run(&self) -> Result<(), TaskError> {
                Err(TaskError::external(std::io::Error::other("boom")))
            }
        }

        let queue = RebuildQueue::spawn("failing", Step::task(Failing));

        assert!(queue.trigger());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(queue.trigger());
    }
}
