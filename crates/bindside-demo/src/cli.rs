use std::path::PathBuf;

use bindside::{BindConfig, Propagation};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::error::{DemoError, Result};
use crate::page::ProfilePage;

/// Drive the profile page from the command line.
///
/// Steps run in a fixed order: `--model`, then every `--set`, then every
/// `--type`, then every `--click`.
#[derive(Debug, Parser)]
#[command(
    name = "bindside-demo",
    about = "Name-form view model over an in-memory document",
    version
)]
pub struct Cli {
    /// JSON object seeding plain properties.
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Write a property directly.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub sets: Vec<(String, String)>,

    /// Type into the input bound to a property and fire its change event.
    /// Fails if the view model rejects the text.
    #[arg(long = "type", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub types: Vec<(String, String)>,

    /// Click the control bound to an action.
    #[arg(long = "click", value_name = "ACTION")]
    pub clicks: Vec<String>,

    /// Refresh only direct dependents, or whole dependency chains.
    #[arg(long)]
    pub propagation: Option<Propagation>,

    /// JSON binding configuration; `BINDSIDE_*` variables override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print property values as JSON instead of the document markup.
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub log_json: bool,
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing property name in {raw:?}"));
    }
    Ok((name.to_owned(), value.to_owned()))
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let output = run(&cli)?;
    println!("{output}");
    Ok(())
}

/// Build the page, apply every step, and return what would be printed.
pub fn run(cli: &Cli) -> Result<String> {
    let config = load_config(cli)?;
    let page = ProfilePage::build(config)?;

    if let Some(path) = &cli.model {
        let model: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        page.vm.bind_model(&model)?;
    }
    for (name, value) in &cli.sets {
        page.vm.set(name, value.as_str())?;
    }
    for (name, value) in &cli.types {
        page.type_into(name, value)?;
    }
    for action in &cli.clicks {
        page.click(action)?;
    }

    if cli.json {
        Ok(serde_json::to_string_pretty(&page.vm.snapshot()?)?)
    } else {
        Ok(page.doc.dump().trim_end().to_owned())
    }
}

fn load_config(cli: &Cli) -> Result<BindConfig> {
    let base = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => BindConfig::default(),
    };
    let mut config = base.overlay(|key| std::env::var(key).ok());
    if let Some(mode) = cli.propagation {
        config = config.with_propagation(mode);
    }
    if config.action_separator.is_empty() {
        return Err(DemoError::invalid("action_separator must not be empty"));
    }
    Ok(config)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
