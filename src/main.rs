mod config;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use conduit_block::{BlockRegistry, Outputs, RunContext};
use conduit_blocks::{Collaborators, register_builtins};
use conduit_model::ConnectedModel;
use conduit_runtime::{AgentSupervisor, ChannelSink, DisplayEvent, Executor, TriggerPayload};

use crate::config::AppConfig;

/// Conduit - an event-driven block workflow engine
#[derive(Parser)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.conduit)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// List the registered block types
  Blocks,

  /// Fire a trigger node with the stdin payload and run everything downstream
  Fire {
    /// Path to the model file (JSON)
    model_file: PathBuf,

    /// The node ID that fires
    #[arg(long)]
    node: String,
  },

  /// Run one node after its upstream dependencies, then continue downstream
  RunNode {
    /// Path to the model file (JSON)
    model_file: PathBuf,

    /// The node ID to execute
    #[arg(long)]
    node: String,
  },

  /// Subscribe every trigger in a model and run passes until Ctrl-C
  Watch {
    /// Path to the model file (JSON)
    model_file: PathBuf,

    #[arg(long, default_value = "cli")]
    agent_id: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".conduit"),
  };

  let config = AppConfig::load_from_dir(&data_dir)?;
  init_tracing(&config);

  match cli.command {
    Some(Commands::Blocks) => list_blocks(),
    Some(Commands::Fire { model_file, node }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(fire(model_file, node, config))?;
    }
    Some(Commands::RunNode { model_file, node }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_node(model_file, node, config))?;
    }
    Some(Commands::Watch {
      model_file,
      agent_id,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(watch(model_file, agent_id, config))?;
    }
    None => {
      println!("conduit - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(config: &AppConfig) {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
    )
    .with_target(false)
    .with_writer(io::stderr)
    .init();
}

fn build_registry(collaborators: Collaborators) -> Arc<BlockRegistry> {
  let mut registry = BlockRegistry::new();
  register_builtins(&mut registry, collaborators);
  Arc::new(registry)
}

fn build_executor(
  config: &AppConfig,
  collaborators: Collaborators,
) -> (Executor, mpsc::UnboundedReceiver<DisplayEvent>) {
  let (sink, events) = ChannelSink::channel();
  let executor = Executor::new(build_registry(collaborators))
    .with_config(config.executor)
    .with_sink(Arc::new(sink));
  (executor, events)
}

fn run_context(config: &AppConfig) -> RunContext {
  match &config.wallet.address {
    Some(address) => RunContext::new().with_wallet(address.clone()),
    None => RunContext::new(),
  }
}

fn list_blocks() {
  let registry = build_registry(Collaborators::default());
  for block_type in registry.block_types() {
    if let Some(block) = registry.get(block_type) {
      let inputs: Vec<&str> = block.inputs().iter().map(|f| f.name.as_str()).collect();
      println!("{:<14} {:<8} {}", block_type, block.category(), inputs.join(", "));
    }
  }
}

async fn load_model(model_file: &Path) -> Result<ConnectedModel> {
  let content = tokio::fs::read_to_string(model_file)
    .await
    .with_context(|| format!("failed to read model file: {}", model_file.display()))?;

  let model = ConnectedModel::from_json(&content)
    .with_context(|| format!("failed to parse model file: {}", model_file.display()))?;

  eprintln!("Loaded model with {} nodes", model.len());
  Ok(model)
}

/// Print whatever display events are queued, one JSON object per line.
fn drain_display_events(events: &mut mpsc::UnboundedReceiver<DisplayEvent>) -> Result<()> {
  while let Ok(event) = events.try_recv() {
    eprintln!("display: {}", serde_json::to_string(&event)?);
  }
  Ok(())
}

async fn fire(model_file: PathBuf, node_id: String, config: AppConfig) -> Result<()> {
  let model = load_model(&model_file).await?;
  if !model.contains(&node_id) {
    bail!("node '{}' not found in model", node_id);
  }

  let outputs = payload_outputs(read_payload_from_stdin()?)?;
  let (executor, mut events) = build_executor(&config, Collaborators::default());

  let report = executor
    .run_downstream(&model, &node_id, outputs, &run_context(&config))
    .await;

  drain_display_events(&mut events)?;
  eprintln!(
    "Pass {} processed {} nodes ({} failed)",
    report.pass_id,
    report.processed.len(),
    report.failures.len()
  );
  println!("{}", serde_json::to_string_pretty(&report)?);

  Ok(())
}

async fn run_node(model_file: PathBuf, node_id: String, config: AppConfig) -> Result<()> {
  let model = load_model(&model_file).await?;
  let (executor, mut events) = build_executor(&config, Collaborators::default());

  let report = executor
    .run_from_node(&model, &node_id, &run_context(&config))
    .await
    .context("node execution failed")?;

  drain_display_events(&mut events)?;
  eprintln!("Ran {} nodes up to '{}'", report.order.len(), node_id);
  println!("{}", serde_json::to_string_pretty(&report)?);

  Ok(())
}

async fn watch(model_file: PathBuf, agent_id: String, config: AppConfig) -> Result<()> {
  let model = Arc::new(load_model(&model_file).await?);
  let collaborators = Collaborators::default();
  let windows = collaborators.windows.clone();
  let (executor, mut events) = build_executor(&config, collaborators);

  tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      match serde_json::to_string(&event) {
        Ok(line) => eprintln!("display: {line}"),
        Err(e) => warn!(error = %e, "failed to encode display event"),
      }
    }
  });

  let on_trigger = Arc::new(|payload: TriggerPayload| match serde_json::to_string(&payload) {
    Ok(line) => println!("{line}"),
    Err(e) => warn!(error = %e, "failed to encode trigger payload"),
  });

  let mut supervisor = AgentSupervisor::new(executor).with_cleanup(windows.agent_cleanup());
  let attached = supervisor.activate(&agent_id, model, run_context(&config), on_trigger, None);
  if attached == 0 {
    bail!("model has no subscribable triggers");
  }
  info!(agent_id = %agent_id, triggers = attached, "watching");

  tokio::signal::ctrl_c()
    .await
    .context("failed to listen for Ctrl-C")?;

  supervisor.deactivate_all().await;
  info!(agent_id = %agent_id, "stopped");
  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}

/// Flatten a JSON object into trigger outputs. Strings are kept verbatim,
/// `null` becomes empty and everything else is re-encoded as JSON.
fn payload_outputs(payload: serde_json::Value) -> Result<Outputs> {
  let serde_json::Value::Object(map) = payload else {
    bail!("payload must be a JSON object");
  };

  Ok(
    map
      .into_iter()
      .map(|(key, value)| {
        let value = match value {
          serde_json::Value::String(s) => s,
          serde_json::Value::Null => String::new(),
          other => other.to_string(),
        };
        (key, value)
      })
      .collect(),
  )
}
