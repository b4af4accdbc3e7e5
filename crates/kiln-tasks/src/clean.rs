//! Distribution directory cleanup.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::pipeline::Task;
use crate::TaskError;

/// Removes the distribution directory recursively.
pub struct CleanTask {
    dist_dir: PathBuf,
}

impl CleanTask {
    /// Create the task.
    pub fn new(dist_dir: PathBuf) -> Self {
        Self { dist_dir }
    }
}

#[async_trait]
impl Task for CleanTask {
    fn name(&self) -> &str {
        "clean"
    }

    async fn run(&self) -> Result<(), TaskError> {
        match tokio::fs::remove_dir_all(&self.dist_dir).await {
            Ok(()) => {
                tracing::debug!(path = %self.dist_dir.display(), "Removed distribution directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TaskError::io(&self.dist_dir)(e)),
        }
    }
}
