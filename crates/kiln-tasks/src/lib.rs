//! Asset pipeline tasks for kiln.
//!
//! Each stage of the pipeline is a [`Task`]:
//!
//! - [`StylesTask`]: Sass → prefixed CSS
//! - [`ScriptsTask`]: ordered concatenation and minification
//! - [`ImagesTask`]: per-format image optimization
//! - [`CleanTask`]: removal of the distribution directory
//! - [`PackageTask`]: copy of pages and compiled assets into the distribution
//!
//! Tasks are composed into [`Step`] trees. [`TaskSet`] builds the project's
//! tasks from a loaded [`Config`] and exposes the standard recipes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kiln_config::Config;
//! use kiln_tasks::{NoReload, TaskSet};
//!
//! let config = Config::load(None, None)?;
//! let tasks = TaskSet::from_config(&config, Arc::new(NoReload))?;
//! tasks.init().run().await?;
//! ```

mod clean;
mod error;
mod fs;
mod images;
mod package;
mod pipeline;
mod reload;
mod scripts;
mod styles;

use std::sync::Arc;

use kiln_config::Config;

pub use clean::CleanTask;
pub use error::TaskError;
pub use images::{ImageKind, ImagesTask, OptimizeError, Optimizer};
pub use package::PackageTask;
pub use pipeline::{Step, Task};
pub use reload::{NoReload, ReloadEvent, ReloadSink};
pub use scripts::ScriptsTask;
pub use styles::StylesTask;

/// The project's tasks, built once per invocation.
#[derive(Clone)]
pub struct TaskSet {
    clean: Step,
    styles: Step,
    scripts: Step,
    images: Step,
    build: Step,
}

impl TaskSet {
    /// Build every task from `config`, reporting outputs to `reload`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Targets`] if the browser queries are invalid.
    pub fn from_config(config: &Config, reload: Arc<dyn ReloadSink>) -> Result<Self, TaskError> {
        let paths = &config.paths_resolved;

        let styles = StylesTask::new(
            paths.style_entry.clone(),
            paths.style_output.clone(),
            &config.styles.browsers,
            Arc::clone(&reload),
        )?;
        let scripts = ScriptsTask::new(
            paths.scripts.clone(),
            paths.script_output.clone(),
            Arc::clone(&reload),
        );
        let images = ImagesTask::new(
            paths.images_dir.clone(),
            paths.images_output.clone(),
            config.images.clone(),
            reload,
        );
        let build = PackageTask::new(
            paths.app_dir.clone(),
            paths.dist_dir.clone(),
            vec![paths.style_output.clone(), paths.script_output.clone()],
        );

        Ok(Self {
            clean: Step::task(CleanTask::new(paths.dist_dir.clone())),
            styles: Step::task(styles),
            scripts: Step::task(scripts),
            images: Step::task(images),
            build: Step::task(build),
        })
    }

    #[must_use]
    pub fn clean(&self) -> Step {
        self.clean.clone()
    }

    #[must_use]
    pub fn styles(&self) -> Step {
        self.styles.clone()
    }

    #[must_use]
    pub fn scripts(&self) -> Step {
        self.scripts.clone()
    }

    #[must_use]
    pub fn images(&self) -> Step {
        self.images.clone()
    }

    /// Packaging only. Compiled assets are not rebuilt.
    #[must_use]
    pub fn build(&self) -> Step {
        self.build.clone()
    }

    /// Full production build from a clean distribution directory.
    #[must_use]
    pub fn init(&self) -> Step {
        Step::Series(vec![
            self.clean(),
            Step::Parallel(vec![self.styles(), self.scripts(), self.images()]),
            self.build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn project(root: &Path) -> Config {
        let app = root.join("app");
        std::fs::create_dir_all(app.join("scss")).unwrap();
        std::fs::create_dir_all(app.join("js")).unwrap();
        std::fs::create_dir_all(app.join("images")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/jquery/dist")).unwrap();
        std::fs::write(root.join("node_modules/jquery/dist/jquery.js"), "var jQuery = {};\n").unwrap();
        std::fs::write(app.join("scss/style.scss"), "$c: red;\nbody { color: $c; }\n").unwrap();
        std::fs::write(app.join("js/main.js"), "function hello() {\n  return 1;\n}\n").unwrap();
        std::fs::write(app.join("images/logo.svg"), "<svg>\n  <g/>\n</svg>\n").unwrap();
        std::fs::write(app.join("index.html"), "<html><body></body></html>").unwrap();

        Config::default_with_base(root)
    }

    #[test]
    fn test_init_composition() {
        let root = tempfile::tempdir().unwrap();
        let tasks = TaskSet::from_config(&project(root.path()), Arc::new(NoReload)).unwrap();

        assert_eq!(
            tasks.init().to_string(),
            "series(clean, parallel(styles, scripts, images), build)"
        );
    }

    #[tokio::test]
    async fn test_init_produces_distribution() {
        let root = tempfile::tempdir().unwrap();
        let config = project(root.path());
        let dist = config.paths_resolved.dist_dir.clone();
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("stale.txt"), "old").unwrap();
        let tasks = TaskSet::from_config(&config, Arc::new(NoReload)).unwrap();

        tasks.init().run().await.unwrap();

        assert!(!dist.join("stale.txt").exists());
        assert!(dist.join("index.html").is_file());
        assert!(dist.join("css/style.min.css").is_file());
        assert!(dist.join("js/main.min.js").is_file());
        assert!(config.paths_resolved.images_output.join("logo.svg").is_file());
    }
}
