//! The watch loop.
//!
//! notify events are fed into the debouncer from a channel. Every poll tick the
//! ready events are drained as one batch and each rule fires at most once for it.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiln_config::Config;
use kiln_tasks::{ReloadEvent, ReloadSink, Task, TaskError, TaskSet};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::WatchError;
use crate::debouncer::{EventDebouncer, FsEvent, FsEventKind};
use crate::rule::{EventFilter, RebuildQueue, WatchAction, WatchRule};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Watches the project and runs rule actions until interrupted.
pub struct WatchTask {
    root: PathBuf,
    debounce: Duration,
    rules: Vec<WatchRule>,
    reload: Arc<dyn ReloadSink>,
}

impl WatchTask {
    pub fn new(
        root: PathBuf,
        debounce: Duration,
        rules: Vec<WatchRule>,
        reload: Arc<dyn ReloadSink>,
    ) -> Self {
        Self {
            root,
            debounce,
            rules,
            reload,
        }
    }

    /// Watcher with the project rules: stylesheets and scripts rebuild, pages
    /// reload.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] if a configured glob is invalid.
    pub fn from_config(
        config: &Config,
        tasks: &TaskSet,
        reload: Arc<dyn ReloadSink>,
    ) -> Result<Self, WatchError> {
        let watch = &config.watch;
        let rules = vec![
            WatchRule::new(
                "styles",
                &watch.styles,
                EventFilter::All,
                WatchAction::Run(tasks.styles()),
            )?,
            WatchRule::new(
                "scripts",
                &watch.scripts,
                EventFilter::All,
                WatchAction::Run(tasks.scripts()),
            )?,
            WatchRule::new("pages", &watch.pages, EventFilter::ModifyOnly, WatchAction::Reload)?,
        ];

        Ok(Self::new(
            config.root.clone(),
            Duration::from_millis(watch.debounce_ms),
            rules,
            reload,
        ))
    }

    /// Run until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the platform watcher cannot be set up.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<(), WatchError> {
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());

        let (tx, mut rx) = mpsc::channel::<Event>(100);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                // Callback runs on the notify thread
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(err) => tracing::warn!(error = %err, "File watcher error"),
            }
        })?;

        for dir in watch_roots(&self.rules) {
            let dir = root.join(dir);
            if !dir.is_dir() {
                tracing::warn!(path = %dir.display(), "Watch directory does not exist, skipping");
                continue;
            }
            watcher.watch(&dir, RecursiveMode::Recursive)?;
            tracing::info!(path = %dir.display(), "Watching");
        }

        let dispatcher = Dispatcher::new(root, &self.rules, Arc::clone(&self.reload));
        let mut debouncer = EventDebouncer::new(self.debounce);
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                Some(event) = rx.recv() => record(&mut debouncer, &event),
                _ = interval.tick() => {
                    let batch = debouncer.drain_ready();
                    if !batch.is_empty() {
                        dispatcher.dispatch(&batch);
                    }
                }
            }
        }

        tracing::info!("Stopped watching");
        Ok(())
    }
}

#[async_trait]
impl Task for WatchTask {
    fn name(&self) -> &str {
        "watching"
    }

    async fn run(&self) -> Result<(), TaskError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            }
        })
        .await
        .map_err(TaskError::external)
    }
}

fn record(debouncer: &mut EventDebouncer, event: &Event) {
    let kind = match event.kind {
        EventKind::Create(_) => FsEventKind::Created,
        EventKind::Modify(_) => FsEventKind::Modified,
        EventKind::Remove(_) => FsEventKind::Removed,
        _ => return,
    };
    for path in &event.paths {
        debouncer.record(path.clone(), kind);
    }
}

/// Rule roots with nested duplicates removed.
fn watch_roots(rules: &[WatchRule]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = rules
        .iter()
        .flat_map(|rule| rule.roots().iter().cloned())
        .collect();
    roots.sort();
    roots.dedup();

    let mut kept: Vec<PathBuf> = Vec::new();
    for root in roots {
        if !kept.iter().any(|k| root.starts_with(k)) {
            kept.push(root);
        }
    }
    kept
}

enum Binding {
    Queue(RebuildQueue),
    Reload,
}

/// Routes debounced batches to rule actions.
struct Dispatcher<'a> {
    root: PathBuf,
    rules: Vec<(&'a WatchRule, Binding)>,
    reload: Arc<dyn ReloadSink>,
}

impl<'a> Dispatcher<'a> {
    fn new(root: PathBuf, rules: &'a [WatchRule], reload: Arc<dyn ReloadSink>) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let binding = match rule.action() {
                    WatchAction::Run(step) => {
                        Binding::Queue(RebuildQueue::spawn(rule.name(), step.clone()))
                    }
                    WatchAction::Reload => Binding::Reload,
                };
                (rule, binding)
            })
            .collect();

        Self {
            root,
            rules,
            reload,
        }
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        path.strip_prefix(&self.root).ok()
    }

    fn dispatch(&self, batch: &[FsEvent]) {
        for (rule, binding) in &self.rules {
            let Some(event) = batch.iter().find(|event| {
                self.relative(&event.path)
                    .is_some_and(|relative| rule.matches(event.kind, relative))
            }) else {
                continue;
            };

            tracing::info!(
                rule = rule.name(),
                path = %event.path.display(),
                kind = ?event.kind,
                "Change detected"
            );

            match binding {
                Binding::Queue(queue) => {
                    queue.trigger();
                }
                Binding::Reload => self.reload.notify(ReloadEvent::Reload {
                    path: event.path.clone(),
                }),
            }
        }
    }
}
