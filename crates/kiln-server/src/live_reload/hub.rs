//! Reload fan-out to connected browsers.

use std::path::{Component, Path, PathBuf};

use kiln_tasks::{ReloadEvent, ReloadSink};
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 100;

/// Message sent over the WebSocket, e.g. `{"type":"css","path":"/css/style.min.css"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum ClientEvent {
    Css { path: String },
    Reload { path: String },
}

/// Process-scoped live reload handle.
///
/// Tasks notify it through [`ReloadSink`]; every connected browser receives the
/// event with the filesystem path translated to a URL path under the served
/// directory.
pub struct LiveReloadHub {
    root: PathBuf,
    sender: broadcast::Sender<ClientEvent>,
}

impl LiveReloadHub {
    /// Create a hub for files served from `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { root, sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    /// URL path of `path`, or `/` when it is not served.
    fn url_path(&self, path: &Path) -> String {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return "/".to_owned();
        };
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        format!("/{}", segments.join("/"))
    }
}

impl ReloadSink for LiveReloadHub {
    fn notify(&self, event: ReloadEvent) {
        let message = match &event {
            ReloadEvent::Css { path } => ClientEvent::Css {
                path: self.url_path(path),
            },
            ReloadEvent::Reload { path } => ClientEvent::Reload {
                path: self.url_path(path),
            },
        };

        match self.sender.send(message) {
            Ok(clients) => {
                tracing::debug!(path = %event.path().display(), clients, "Sent live reload event");
            }
            Err(_) => {
                tracing::debug!(path = %event.path().display(), "No browsers connected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_client_event_json() {
        let css = ClientEvent::Css {
            path: "/css/style.min.css".to_owned(),
        };
        let reload = ClientEvent::Reload {
            path: "/".to_owned(),
        };

        assert_eq!(
            serde_json::to_string(&css).unwrap(),
            r#"{"type":"css","path":"/css/style.min.css"}"#
        );
        assert_eq!(
            serde_json::to_string(&reload).unwrap(),
            r#"{"type":"reload","path":"/"}"#
        );
    }

    #[test]
    fn test_url_path() {
        let hub = LiveReloadHub::new(PathBuf::from("/site/app"));

        assert_eq!(hub.url_path(Path::new("/site/app/css/style.min.css")), "/css/style.min.css");
        assert_eq!(hub.url_path(Path::new("/site/app")), "/");
        assert_eq!(hub.url_path(Path::new("/site/dist/images")), "/");
    }

    #[tokio::test]
    async fn test_notify_reaches_subscribers() {
        let hub = LiveReloadHub::new(PathBuf::from("/site/app"));
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.notify(ReloadEvent::Css {
            path: PathBuf::from("/site/app/css/style.min.css"),
        });

        let expected = ClientEvent::Css {
            path: "/css/style.min.css".to_owned(),
        };
        assert_eq!(first.recv().await.unwrap(), expected);
        assert_eq!(second.recv().await.unwrap(), expected);
    }

    #[test]
    fn test_notify_without_subscribers() {
        let hub = LiveReloadHub::new(PathBuf::from("/site/app"));
        hub.notify(ReloadEvent::Reload {
            path: PathBuf::from("/site/app/index.html"),
        });
    }
}
