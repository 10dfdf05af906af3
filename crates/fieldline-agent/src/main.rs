//! `fieldline`: run an operator session against a local SQLite store.
//!
//! Reads `fieldline.toml` (or the path given with `--config`) and
//! `FIELDLINE_*` environment variables, then reads commands from stdin until
//! `quit`, end of input or Ctrl-C. Type `help` for the command list.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use fieldline_agent::{
  Agent, AgentConfig, Flow,
  command::{self, HELP},
  platform::Console,
};
use fieldline_store_sqlite::SqliteStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Fieldline realtime operator session")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "fieldline.toml")]
  config: PathBuf,

  /// Use a throwaway in-memory store instead of `store_path`.
  #[arg(long)]
  in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so stdout carries only session output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = AgentConfig::load(&cli.config).context("failed to load configuration")?;

  let store = if cli.in_memory {
    SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store")?
  } else {
    let store_path = expand_tilde(&config.store_path);
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?
  };

  let console = Console::stdout();
  let mut agent = Agent::start(&config, Arc::new(store), console.clone()).await?;
  console.line(format_args!("{HELP}"))?;

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    let line = tokio::select! {
      line = lines.next_line() => line.context("failed to read stdin")?,
      _ = tokio::signal::ctrl_c() => None,
    };
    let Some(line) = line else { break };

    let command = match command::parse(&line) {
      Ok(Some(command)) => command,
      Ok(None) => continue,
      Err(e) => {
        console.line(format_args!("{e}"))?;
        continue;
      }
    };
    match agent.execute(command).await {
      Ok(Flow::Continue) => {}
      Ok(Flow::Quit) => break,
      Err(e) => {
        tracing::warn!(error = %e, "command failed");
        console.line(format_args!("error: {e:#}"))?;
      }
    }
  }

  agent.shutdown().await;
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
