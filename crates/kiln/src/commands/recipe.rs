//! Step trees for each command.

use std::sync::Arc;

use kiln_config::Config;
use kiln_server::{LiveReloadHub, ServeTask, ServerConfig};
use kiln_tasks::{NoReload, ReloadSink, Step, TaskSet};
use kiln_watch::WatchTask;

use super::Commands;
use crate::error::CliError;

/// A command's step tree and, when it serves, the server URL.
pub(crate) struct Recipe {
    pub step: Step,
    pub url: Option<String>,
}

/// Build the recipe for `command`.
///
/// Commands that serve share one [`LiveReloadHub`] between the server and the
/// tasks they run; the others report to [`NoReload`].
pub(crate) fn recipe(command: Option<Commands>, config: &Config) -> Result<Recipe, CliError> {
    let serves = matches!(command, None | Some(Commands::Browsersync));
    let hub = Arc::new(LiveReloadHub::new(config.paths_resolved.app_dir.clone()));
    let sink: Arc<dyn ReloadSink> = if serves {
        Arc::clone(&hub) as Arc<dyn ReloadSink>
    } else {
        Arc::new(NoReload)
    };

    let tasks = TaskSet::from_config(config, Arc::clone(&sink))?;
    let server = ServerConfig::from_config(config);
    let url = serves.then(|| server.url());
    let serve = || Step::task(ServeTask::new(server.clone(), Arc::clone(&hub)));

    let step = match command {
        Some(Commands::Init) => tasks.init(),
        Some(Commands::Styles) => tasks.styles(),
        Some(Commands::Scripts) => tasks.scripts(),
        Some(Commands::Images) => tasks.images(),
        Some(Commands::Build) => tasks.build(),
        Some(Commands::Browsersync) => serve(),
        Some(Commands::Watching) => {
            Step::task(WatchTask::from_config(config, &tasks, Arc::clone(&sink))?)
        }
        None => {
            let watch = Step::task(WatchTask::from_config(config, &tasks, Arc::clone(&sink))?);
            Step::Series(vec![
                Step::Parallel(vec![tasks.styles(), tasks.scripts()]),
                Step::Parallel(vec![serve(), watch]),
            ])
        }
    };

    Ok(Recipe { step, url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn describe(command: Option<Commands>) -> String {
        let config = Config::default_with_base(Path::new("/site"));
        recipe(command, &config).unwrap().step.to_string()
    }

    #[test]
    fn test_default_recipe() {
        assert_eq!(
            describe(None),
            "series(parallel(styles, scripts), parallel(browsersync, watching))"
        );
    }

    #[test]
    fn test_init_recipe() {
        assert_eq!(
            describe(Some(Commands::Init)),
            "series(clean, parallel(styles, scripts, images), build)"
        );
    }

    #[test]
    fn test_single_task_recipes() {
        assert_eq!(describe(Some(Commands::Styles)), "styles");
        assert_eq!(describe(Some(Commands::Scripts)), "scripts");
        assert_eq!(describe(Some(Commands::Images)), "images");
        assert_eq!(describe(Some(Commands::Build)), "build");
        assert_eq!(describe(Some(Commands::Watching)), "watching");
        assert_eq!(describe(Some(Commands::Browsersync)), "browsersync");
    }

    #[test]
    fn test_only_serving_commands_have_url() {
        let config = Config::default_with_base(Path::new("/site"));

        let default = recipe(None, &config).unwrap();
        let build = recipe(Some(Commands::Build), &config).unwrap();

        assert_eq!(default.url.as_deref(), Some("http://localhost:3000/"));
        assert_eq!(build.url, None);
    }
}
