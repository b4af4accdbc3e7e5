//! Stylesheet compilation.
//!
//! `style.scss` is compiled with grass in expanded style, vendor-prefixed for
//! the configured browserslist queries, and written to a single output file.
//! Compile errors are logged and leave the previous output in place.

mod grid;
mod prefix;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lightningcss::targets::Browsers;

use self::prefix::Prefixer;

use crate::fs::write_file;
use crate::pipeline::Task;
use crate::reload::{ReloadEvent, ReloadSink};
use crate::TaskError;

/// Compiles the stylesheet entry into the CSS output.
pub struct StylesTask {
    entry: PathBuf,
    output: PathBuf,
    prefixer: Prefixer,
    reload: Arc<dyn ReloadSink>,
}

/// Non-fatal stylesheet error.
#[derive(Debug, thiserror::Error)]
enum CompileError {
    #[error("{0}")]
    Sass(String),
    #[error("{0}")]
    Prefix(String),
}

impl StylesTask {
    /// Create the task, resolving `browsers` queries up front.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Targets`] if a query cannot be resolved.
    pub fn new(
        entry: PathBuf,
        output: PathBuf,
        browsers: &[String],
        reload: Arc<dyn ReloadSink>,
    ) -> Result<Self, TaskError> {
        let browsers =
            Browsers::from_browserslist(browsers).map_err(|e| TaskError::Targets {
                queries: browsers.to_vec(),
                message: e.to_string(),
            })?;

        Ok(Self {
            entry,
            output,
            prefixer: Prefixer::new(browsers),
            reload,
        })
    }
}

#[async_trait]
impl Task for StylesTask {
    fn name(&self) -> &str {
        "styles"
    }

    async fn run(&self) -> Result<(), TaskError> {
        tokio::fs::metadata(&self.entry)
            .await
            .map_err(TaskError::io(&self.entry))?;

        let entry = self.entry.clone();
        let prefixer = self.prefixer;
        let compiled = tokio::task::spawn_blocking(move || compile(&entry, &prefixer)).await?;

        let css = match compiled {
            Ok(css) => css,
            Err(err) => {
                tracing::error!(
                    path = %self.entry.display(),
                    error = %err,
                    "Stylesheet failed to compile, keeping previous output"
                );
                return Ok(());
            }
        };

        write_file(&self.output, css).await?;
        tracing::debug!(path = %self.output.display(), "Wrote stylesheet");

        self.reload.notify(ReloadEvent::Css {
            path: self.output.clone(),
        });
        Ok(())
    }
}

/// Compile `entry` to CSS and apply vendor prefixes.
fn compile(entry: &Path, prefixer: &Prefixer) -> Result<String, CompileError> {
    let options = grass::Options::default().style(grass::OutputStyle::Expanded);
    let css = grass::from_path(entry, &options).map_err(|e| CompileError::Sass(e.to_string()))?;
    prefixer.run(&css).map_err(CompileError::Prefix)
}
