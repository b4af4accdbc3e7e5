//! CLI commands.
//!
//! Every command maps to a fixed [`Step`](kiln_tasks::Step) tree built by
//! [`recipe::recipe`].

mod recipe;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use kiln_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Options accepted by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover kiln.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dev server host (overrides config).
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Dev server port (overrides config).
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Disable live reload.
    #[arg(long, global = true)]
    pub no_live_reload: bool,
}

/// Pipeline tasks. Without a command: styles and scripts, then serve and watch.
#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Clean dist/, compile everything, then package.
    Init,
    /// Compile the stylesheet.
    Styles,
    /// Bundle and minify scripts.
    Scripts,
    /// Optimize images into dist/.
    Images,
    /// Package pages and compiled assets into dist/ without recompiling.
    Build,
    /// Serve app/ with live reload.
    Browsersync,
    /// Watch sources and rebuild on change.
    Watching,
}

impl Commands {
    /// Whether the command runs until interrupted.
    fn is_long_running(command: Option<Self>) -> bool {
        matches!(command, None | Some(Self::Browsersync | Self::Watching))
    }

    fn label(command: Option<Self>) -> &'static str {
        match command {
            None => "default",
            Some(Self::Init) => "init",
            Some(Self::Styles) => "styles",
            Some(Self::Scripts) => "scripts",
            Some(Self::Images) => "images",
            Some(Self::Build) => "build",
            Some(Self::Browsersync) => "browsersync",
            Some(Self::Watching) => "watching",
        }
    }
}

/// Load the configuration and run `command`.
pub(crate) async fn execute(command: Option<Commands>, args: GlobalArgs) -> Result<(), CliError> {
    let output = Output::new();

    let settings = CliSettings {
        host: args.host,
        port: args.port,
        live_reload_enabled: args.no_live_reload.then_some(false),
    };
    let config = Config::load(args.config.as_deref(), Some(&settings))?;
    if let Some(path) = &config.config_path {
        output.info(&format!("Using {}", path.display()));
    }

    let recipe = recipe::recipe(command, &config)?;
    if let Some(url) = &recipe.url {
        output.highlight(&format!("Serving {} at {url}", config.paths_resolved.app_dir.display()));
        if !config.live_reload.enabled {
            output.warning("Live reload: disabled");
        }
    }
    if Commands::is_long_running(command) {
        output.info("Press Ctrl+C to stop");
    }

    recipe.step.run().await?;

    output.success(&format!("Finished '{}'", Commands::label(command)));
    Ok(())
}
