//! File watching for kiln.
//!
//! A [`WatchTask`] watches the project tree and maps changes to actions through
//! [`WatchRule`]s:
//!
//! | Rule | Events | Action |
//! | --- | --- | --- |
//! | `styles` | create, modify, remove | re-run the stylesheet build |
//! | `scripts` | create, modify, remove | re-run the script bundle |
//! | `pages` | modify | reload connected browsers |
//!
//! Raw events are debounced per path. Each rule rebuilds serially with at most
//! one run queued behind the current one, and a failed rebuild never stops the
//! watcher.

mod debouncer;
mod error;
mod globs;
mod rule;
mod watcher;

pub use error::WatchError;
pub use globs::GlobSet;
pub use rule::{EventFilter, WatchAction, WatchRule};
pub use watcher::WatchTask;
