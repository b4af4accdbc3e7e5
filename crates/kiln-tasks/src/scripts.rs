//! Script bundling.
//!
//! The inputs are concatenated in order, parsed as one classic script and
//! printed back without comments or insignificant whitespace. Printing works
//! from the syntax tree, so a line break that ends a statement comes out as an
//! explicit `;`. Identifiers are never renamed.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::fs::write_file;
use crate::pipeline::Task;
use crate::reload::{ReloadEvent, ReloadSink};
use crate::TaskError;

/// Separator placed between concatenated files.
const SEPARATOR: &str = "\n";

/// Concatenates the script inputs in order and minifies the result.
///
/// Order is significant: libraries must come before the code that uses them.
/// A bundle that fails to parse is logged and the previous output is kept.
pub struct ScriptsTask {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    reload: Arc<dyn ReloadSink>,
}

impl ScriptsTask {
    /// Create the task.
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf, reload: Arc<dyn ReloadSink>) -> Self {
        Self {
            inputs,
            output,
            reload,
        }
    }

    async fn concat(&self) -> Result<String, TaskError> {
        let mut bundle = String::new();
        for input in &self.inputs {
            let source = tokio::fs::read_to_string(input)
                .await
                .map_err(TaskError::io(input))?;
            if !bundle.is_empty() {
                bundle.push_str(SEPARATOR);
            }
            bundle.push_str(&source);
        }
        Ok(bundle)
    }
}

#[async_trait]
impl Task for ScriptsTask {
    fn name(&self) -> &str {
        "scripts"
    }

    async fn run(&self) -> Result<(), TaskError> {
        let bundle = self.concat().await?;
        let original_len = bundle.len();

        let minified = match tokio::task::spawn_blocking(move || minify(&bundle)).await? {
            Ok(code) => code,
            Err(err) => {
                tracing::error!(
                    path = %self.output.display(),
                    error = %err,
                    "Scripts failed to parse, keeping previous output"
                );
                return Ok(());
            }
        };

        tracing::debug!(
            inputs = self.inputs.len(),
            original_len,
            minified_len = minified.len(),
            "Bundled scripts"
        );

        write_file(&self.output, minified).await?;
        self.reload.notify(ReloadEvent::Reload {
            path: self.output.clone(),
        });
        Ok(())
    }
}

/// Parse `source` as a classic script and print it minified.
///
/// Returns the first syntax error on failure.
fn minify(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_script(true);
    let parsed = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(error.to_string());
    }

    let printed = Codegen::new()
        .with_options(CodegenOptions::minify())
        .build(&parsed.program);
    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::testing::RecordingSink;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const LIBRARY: &str = r"
/*! Library v1.0 */
(function (global) {
    // attach the library
    global.libraryMarker = function () {
        return 'library';
    };
})(this);
";

    const PROJECT: &str = r"
// Project code depends on the library
document.addEventListener('DOMContentLoaded', function () {
    var projectMarker = libraryMarker();
    console.log(projectMarker);
});
";

    fn setup(dir: &Path) -> ScriptsTask {
        std::fs::create_dir_all(dir.join("vendor")).unwrap();
        std::fs::create_dir_all(dir.join("js")).unwrap();
        std::fs::write(dir.join("vendor/library.js"), LIBRARY).unwrap();
        std::fs::write(dir.join("js/main.js"), PROJECT).unwrap();

        ScriptsTask::new(
            vec![dir.join("vendor/library.js"), dir.join("js/main.js")],
            dir.join("js/main.min.js"),
            Arc::new(crate::NoReload),
        )
    }

    #[tokio::test]
    async fn test_library_precedes_project_code() {
        let dir = tempfile::tempdir().unwrap();
        let task = setup(dir.path());

        task.run().await.unwrap();

        let bundle = std::fs::read_to_string(dir.path().join("js/main.min.js")).unwrap();
        let library = bundle.find("global.libraryMarker").unwrap();
        let project = bundle.find("var projectMarker").unwrap();
        assert!(library < project, "wrong order in: {bundle}");
    }

    #[tokio::test]
    async fn test_output_is_minified() {
        let dir = tempfile::tempdir().unwrap();
        let task = setup(dir.path());

        task.run().await.unwrap();

        let bundle = std::fs::read_to_string(dir.path().join("js/main.min.js")).unwrap();
        assert!(!bundle.contains("// attach the library"));
        assert!(!bundle.contains("// Project code"));
        assert!(bundle.len() < LIBRARY.len() + PROJECT.len());
    }

    #[tokio::test]
    async fn test_output_overwritten_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let task = setup(dir.path());
        std::fs::write(dir.path().join("js/main.min.js"), "stale();").unwrap();

        task.run().await.unwrap();

        let bundle = std::fs::read_to_string(dir.path().join("js/main.min.js")).unwrap();
        assert!(!bundle.contains("stale"));
    }

    #[test]
    fn test_minify_newline_separated_statements() {
        let minified = minify("var a = 1\nvar b = 2\nconsole.log(a + b)\n").unwrap();

        assert!(minified.contains("var a=1;"), "statement merged in: {minified}");
        assert!(minified.contains("var b=2;"), "statement merged in: {minified}");
        assert!(minified.contains("console.log(a+b)"), "unexpected output: {minified}");
    }

    #[test]
    fn test_minify_keeps_return_line_break() {
        let minified = minify("function f() {\n  return\n  42\n}").unwrap();

        assert!(minified.contains("return;"), "return picked up value in: {minified}");
        assert!(!minified.contains("return 42"), "return picked up value in: {minified}");
    }

    #[test]
    fn test_minify_keeps_prefix_increment_separate() {
        let minified = minify("var x = a\n++b").unwrap();

        assert!(minified.contains("x=a;"), "unexpected output: {minified}");
        assert!(minified.contains("++b"), "unexpected output: {minified}");
        assert!(!minified.contains("a++"), "increment rebound in: {minified}");
    }

    #[test]
    fn test_minify_keeps_call_continuation() {
        // A line starting with `(` continues the previous expression in the source too
        let minified = minify("var z = a\n(function(){})()").unwrap();

        assert!(minified.contains("z=a(function(){})()"), "unexpected output: {minified}");
    }

    #[test]
    fn test_minify_rejects_syntax_error() {
        assert!(minify("var = ;").is_err());
    }

    #[tokio::test]
    async fn test_files_without_trailing_semicolon() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("first.js"), "var first = 1").unwrap();
        std::fs::write(dir.path().join("second.js"), "var second = 2").unwrap();
        let task = ScriptsTask::new(
            vec![dir.path().join("first.js"), dir.path().join("second.js")],
            dir.path().join("out.js"),
            Arc::new(crate::NoReload),
        );

        task.run().await.unwrap();

        let bundle = std::fs::read_to_string(dir.path().join("out.js")).unwrap();
        assert!(bundle.contains("var first=1;"), "unexpected output: {bundle}");
        assert!(bundle.contains("var second=2"), "unexpected output: {bundle}");
    }

    #[tokio::test]
    async fn test_syntax_error_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "function (").unwrap();
        std::fs::write(dir.path().join("out.js"), "previous();").unwrap();
        let sink = Arc::new(RecordingSink::default());
        let task = ScriptsTask::new(
            vec![dir.path().join("main.js")],
            dir.path().join("out.js"),
            Arc::clone(&sink) as Arc<dyn ReloadSink>,
        );

        task.run().await.unwrap();

        let bundle = std::fs::read_to_string(dir.path().join("out.js")).unwrap();
        assert_eq!(bundle, "previous();");
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let task = ScriptsTask::new(
            vec![dir.path().join("missing.js")],
            dir.path().join("out.js"),
            Arc::new(crate::NoReload),
        );

        let err = task.run().await.unwrap_err();

        assert!(matches!(err, TaskError::Io { ref path, .. } if path.ends_with("missing.js")));
        assert!(!dir.path().join("out.js").exists());
    }

    #[tokio::test]
    async fn test_signals_reload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut task = setup(dir.path());
        task.reload = Arc::clone(&sink) as Arc<dyn ReloadSink>;

        task.run().await.unwrap();

        assert_eq!(
            sink.events(),
            vec![ReloadEvent::Reload {
                path: dir.path().join("js/main.min.js")
            }]
        );
    }
}
