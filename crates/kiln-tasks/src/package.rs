//! Packaging of the working tree into the distribution directory.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::fs::{glob_files, relative_to};
use crate::pipeline::Task;
use crate::TaskError;

/// Pages copied from the working tree, relative to `app_dir`.
const PAGES_PATTERN: &str = "**/*.html";

/// Copies HTML pages and the compiled assets from `app_dir` into `dist_dir`.
///
/// Paths are preserved relative to `app_dir`. Nothing is recompiled: the
/// compiled stylesheet and bundle are copied as they currently are, and a
/// missing one fails the task.
pub struct PackageTask {
    app_dir: PathBuf,
    dist_dir: PathBuf,
    assets: Vec<PathBuf>,
}

impl PackageTask {
    /// Create the task. `assets` are the compiled outputs to ship.
    pub fn new(app_dir: PathBuf, dist_dir: PathBuf, assets: Vec<PathBuf>) -> Self {
        Self {
            app_dir,
            dist_dir,
            assets,
        }
    }
}

#[async_trait]
impl Task for PackageTask {
    fn name(&self) -> &str {
        "build"
    }

    async fn run(&self) -> Result<(), TaskError> {
        let mut files = glob_files(&self.app_dir, PAGES_PATTERN)?;
        files.extend(self.assets.iter().cloned());

        for file in &files {
            let relative = relative_to(file, &self.app_dir)?;
            let target = self.dist_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(TaskError::io(parent))?;
            }
            tokio::fs::copy(file, &target)
                .await
                .map_err(TaskError::io(file))?;
        }

        tracing::debug!(
            count = files.len(),
            dist = %self.dist_dir.display(),
            "Packaged files"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn populate(app: &Path) {
        std::fs::create_dir_all(app.join("pages/about")).unwrap();
        std::fs::create_dir_all(app.join("css")).unwrap();
        std::fs::create_dir_all(app.join("js")).unwrap();
        std::fs::create_dir_all(app.join("scss")).unwrap();
        std::fs::write(app.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(app.join("pages/about/index.html"), "<h1>about</h1>").unwrap();
        std::fs::write(app.join("css/style.min.css"), "body{}").unwrap();
        std::fs::write(app.join("js/main.min.js"), "run();").unwrap();
        std::fs::write(app.join("js/main.js"), "source").unwrap();
        std::fs::write(app.join("scss/style.scss"), "source").unwrap();
    }

    fn task(root: &Path) -> PackageTask {
        let app = root.join("app");
        PackageTask::new(
            app.clone(),
            root.join("dist"),
            vec![app.join("css/style.min.css"), app.join("js/main.min.js")],
        )
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut files: Vec<String> = glob_files(dir, "**/*")
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_copies_pages_and_compiled_assets() {
        let root = tempfile::tempdir().unwrap();
        populate(&root.path().join("app"));

        task(root.path()).run().await.unwrap();

        assert_eq!(
            listing(&root.path().join("dist")),
            vec![
                "css/style.min.css",
                "index.html",
                "js/main.min.js",
                "pages/about/index.html",
            ]
        );
    }

    #[tokio::test]
    async fn test_packages_stale_outputs_without_recompiling() {
        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        populate(&app);
        std::fs::write(app.join("css/style.min.css"), "/* stale */").unwrap();

        task(root.path()).run().await.unwrap();

        let css = std::fs::read_to_string(root.path().join("dist/css/style.min.css")).unwrap();
        assert_eq!(css, "/* stale */");
    }

    #[tokio::test]
    async fn test_missing_compiled_asset_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        populate(&app);
        std::fs::remove_file(app.join("js/main.min.js")).unwrap();

        let err = task(root.path()).run().await.unwrap_err();

        assert!(matches!(err, TaskError::Io { ref path, .. } if path.ends_with("main.min.js")));
    }
}
