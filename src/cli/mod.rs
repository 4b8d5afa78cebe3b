//! CLI argument parsing using clap 4.x derive macros

use clap::Parser;
use sitesmith_core::Config;
use std::path::PathBuf;

/// Build websites from a description by letting a model drive your shell
///
/// With no goal, starts an interactive session that asks for one goal at a
/// time. With a goal, runs it once and exits.
#[derive(Parser, Debug)]
#[command(name = "sitesmith")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Goal to run once, e.g. "create a landing page named Foo"
    #[arg(num_args = 1..)]
    pub goal: Vec<String>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model identifier (overrides config and environment)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Model calls allowed per goal; 0 for no limit
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Directory the generated commands run in
    #[arg(short = 'w', long)]
    pub workdir: Option<PathBuf>,

    /// Show tool results as they come back
    #[arg(short, long)]
    pub verbose: bool,

    /// Print version information
    #[arg(long)]
    pub version: bool,
}

impl Cli {
    /// The one-shot goal, if any words were given
    pub fn goal(&self) -> Option<String> {
        if self.goal.is_empty() {
            None
        } else {
            Some(self.goal.join(" "))
        }
    }

    /// Apply flags on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
        if let Some(turns) = self.max_turns {
            config.agent.max_turns = turns;
        }
        if let Some(dir) = &self.workdir {
            config.executor.working_dir = Some(dir.clone());
        }
        if self.verbose {
            config.agent.verbose = true;
        }
    }
}
