//! Trailing debounce for filesystem events.
//!
//! Editors emit several events per save. Events are held per path until no new
//! event arrived for the debounce window, then released as one.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Kind of filesystem event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FsEventKind {
    Created,
    Modified,
    Removed,
}

/// A debounced filesystem event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

struct Pending {
    kind: FsEventKind,
    deadline: Instant,
}

/// Per-path event debouncer, owned by the watch loop.
pub(crate) struct EventDebouncer {
    pending: HashMap<PathBuf, Pending>,
    window: Duration,
}

impl EventDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Record an event, pushing the path's deadline back by one window.
    pub(crate) fn record(&mut self, path: PathBuf, kind: FsEventKind) {
        let deadline = Instant::now() + self.window;

        match self.pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut entry) => match coalesce(entry.get().kind, kind) {
                Some(kind) => {
                    *entry.get_mut() = Pending { kind, deadline };
                }
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Remove and return every event whose window has elapsed, sorted by path.
    pub(crate) fn drain_ready(&mut self) -> Vec<FsEvent> {
        let now = Instant::now();
        let mut ready: Vec<FsEvent> = self
            .pending
            .extract_if(|_, pending| pending.deadline <= now)
            .map(|(path, pending)| FsEvent {
                path,
                kind: pending.kind,
            })
            .collect();
        ready.sort_by(|a, b| a.path.cmp(&b.path));
        ready
    }
}

/// Merge a new event into a pending one. `None` drops the path entirely.
#[allow(clippy::match_same_arms)]
fn coalesce(pending: FsEventKind, new: FsEventKind) -> Option<FsEventKind> {
    use FsEventKind::{Created, Modified, Removed};

    match (pending, new) {
        (Created, Created | Modified) => Some(Created),
        // Never seen by a rule
        (Created, Removed) => None,
        (Modified, Created) => Some(Created),
        (Modified, Modified) => Some(Modified),
        (Modified, Removed) => Some(Removed),
        // Replaced in place
        (Removed, Created) => Some(Modified),
        (Removed, Modified | Removed) => Some(Removed),
    }
}
