//! `sitesmith` - build websites from a description, one shell command at a time
//!
//! The model plans, the agent runs each command it asks for and reports the
//! result back, until the model says the site is done.

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::IsTerminal;
use std::sync::Arc;

use crate::cli::Cli;
use sitesmith_core::agent::{system_instruction, AgentEvent, Platform};
use sitesmith_core::config;
use sitesmith_core::llm::ModelClient;
use sitesmith_core::{AgentError, AgentLoop, Config, GeminiClient, RetryingClient, ToolRegistry};

mod cli;

const BANNER: &str = "I am a cursor, lets create a website.";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        let blue = Style::new().blue();
        println!(
            "{} v{} ({})",
            blue.apply_to("sitesmith"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    let mut config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if let Some(path) = config.log_file() {
        if let Err(e) = sitesmith_core::agent::logger::init(path.clone()) {
            eprintln!(
                "{}",
                Style::new().dim().apply_to(format!("Logging disabled ({}): {}", path.display(), e))
            );
        }
    }

    let agent = match build_agent(&config) {
        Ok(agent) => agent,
        Err(e) => {
            print_error(&e);
            if matches!(e, AgentError::MissingConfig { .. }) {
                println!(
                    "{}",
                    Style::new().dim().apply_to("Hint: export SITESMITH_API_KEY=<your key>")
                );
            }
            std::process::exit(1);
        }
    };

    match cli.goal() {
        Some(goal) => {
            if !run_goal(&agent, &goal).await {
                std::process::exit(1);
            }
        }
        None => interactive(&agent).await?,
    }

    Ok(())
}

/// Wire the client, retry wrapper, tools and loop together from `config`.
fn build_agent(config: &Config) -> sitesmith_core::Result<AgentLoop> {
    let yellow = Style::new().yellow();
    let dim = Style::new().dim();
    let verbose = config.agent.verbose;

    let gemini: Arc<dyn ModelClient> = Arc::new(GeminiClient::new(config.llm_config()?)?);
    let client = RetryingClient::new(gemini, config.retry_policy()).with_status_callback(Arc::new(
        move |status: &str| println!("{}", yellow.apply_to(status)),
    ));

    let executor = Arc::new(config.command_executor());
    if let Some(dir) = executor.working_dir() {
        std::fs::create_dir_all(dir)?;
    }

    let agent = AgentLoop::new(
        Arc::new(client),
        ToolRegistry::with_defaults(executor),
        system_instruction(Platform::detect()),
    )
    .with_max_turns(config.agent.max_turns)
    .with_event_callback(Arc::new(move |event: &AgentEvent| match event {
        AgentEvent::ToolRequested { name, arguments } => {
            let shown = arguments
                .get("command")
                .and_then(|c| c.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| arguments.to_string());
            println!("{} {}", dim.apply_to(format!("{}:", name)), shown);
        }
        AgentEvent::ToolCompleted { result, .. } if verbose => {
            println!("{}", dim.apply_to(result));
        }
        _ => {}
    }));

    Ok(agent)
}

/// Run one goal and print the outcome. Returns whether it succeeded.
async fn run_goal(agent: &AgentLoop, goal: &str) -> bool {
    match agent.run(goal).await {
        Ok(run) => {
            println!("\n{}", run.final_text);
            true
        }
        Err(e) => {
            print_error(&e);
            false
        }
    }
}

async fn interactive(agent: &AgentLoop) -> Result<()> {
    println!("{}", Style::new().cyan().bold().apply_to(BANNER));

    let theme = ColorfulTheme::default();
    let tty = std::io::stdin().is_terminal();

    loop {
        let input = if tty {
            match Input::<String>::with_theme(&theme)
                .with_prompt("Ask me anything")
                .allow_empty(true)
                .interact_text()
            {
                Ok(line) => line,
                // Ctrl-D / closed terminal
                Err(_) => break,
            }
        } else {
            let mut line = String::new();
            let read = std::io::stdin()
                .read_line(&mut line)
                .context("Failed to read goal from stdin")?;
            if read == 0 {
                break;
            }
            line
        };

        let goal = input.trim();
        if goal.is_empty() {
            continue;
        }
        if goal.eq_ignore_ascii_case("exit") || goal.eq_ignore_ascii_case("quit") {
            break;
        }

        // Errors end the goal, not the session.
        run_goal(agent, goal).await;
    }

    Ok(())
}

fn print_error(e: &AgentError) {
    eprintln!("{} {}", Style::new().red().bold().apply_to("Error:"), Style::new().red().apply_to(e.user_message()));
}
