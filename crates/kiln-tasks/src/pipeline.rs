//! Task composition.
//!
//! A [`Step`] is either a single [`Task`], a sequence of steps run one after the
//! other, or a group of steps started together. Composition is fixed when the
//! step tree is built.
//!
//! ```text
//! init = Series[clean, Parallel[styles, scripts, images], build]
//! ```
//!
//! - `Series` awaits each member before starting the next and stops at the first
//!   error.
//! - `Parallel` spawns every member, waits for all of them, and on the first
//!   error aborts the rest and returns that error.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::TaskError;

/// A named unit of pipeline work.
#[async_trait]
pub trait Task: Send + Sync {
    /// Name shown in logs (e.g. `styles`).
    fn name(&self) -> &str;

    /// Run the task to completion.
    async fn run(&self) -> Result<(), TaskError>;
}

/// A node in the task graph.
#[derive(Clone)]
pub enum Step {
    /// A single task.
    Task(Arc<dyn Task>),
    /// Members run in order.
    Series(Vec<Step>),
    /// Members run concurrently.
    Parallel(Vec<Step>),
}

type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'a>>;

impl Step {
    /// Wrap a task.
    pub fn task(task: impl Task + 'static) -> Self {
        Self::Task(Arc::new(task))
    }

    /// Run the step tree.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any task in the tree.
    pub fn run(&self) -> StepFuture<'_> {
        Box::pin(async move {
            match self {
                Self::Task(task) => run_logged(task.as_ref()).await,
                Self::Series(steps) => {
                    for step in steps {
                        step.run().await?;
                    }
                    Ok(())
                }
                Self::Parallel(steps) => run_parallel(steps).await,
            }
        })
    }
}

async fn run_parallel(steps: &[Step]) -> Result<(), TaskError> {
    let mut set = JoinSet::new();
    for step in steps {
        let step = step.clone();
        set.spawn(async move { step.run().await });
    }

    while let Some(joined) = set.join_next().await {
        let result = joined.map_err(TaskError::from).and_then(|r| r);
        if let Err(err) = result {
            set.abort_all();
            return Err(err);
        }
    }
    Ok(())
}

async fn run_logged(task: &dyn Task) -> Result<(), TaskError> {
    let name = task.name();
    let start = Instant::now();
    tracing::info!(task = name, "Starting '{name}'...");

    let result = task.run().await;
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(()) => tracing::info!(task = name, elapsed_ms, "Finished '{name}' after {elapsed_ms} ms"),
        Err(err) => tracing::error!(
            task = name,
            elapsed_ms,
            error = %err,
            "'{name}' errored after {elapsed_ms} ms"
        ),
    }
    result
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, steps) = match self {
            Self::Task(task) => return f.write_str(task.name()),
            Self::Series(steps) => ("series", steps),
            Self::Parallel(steps) => ("parallel", steps),
        };
        write!(f, "{label}(")?;
        for (i, step) in steps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{step}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
