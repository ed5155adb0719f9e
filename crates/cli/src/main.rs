//! `form-pipeline` CLI entry-point.
//!
//! Available sub-commands:
//! - `render`   — print the render model of a form definition.
//! - `submit`   — map a submission payload to the output record.
//! - `validate` — validate a workflow JSON file.
//! - `resolve`  — expand `{{ $json... }}` placeholders against JSON data.

mod evaluator;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use forms::{FormMode, SubmissionSource, FORM_NODE_TYPE, FORM_TRIGGER_NODE_TYPE};
use nodes::{ExecutableNode, ExecutionContext, FilesystemStorage, FormConfig, FormNode};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::evaluator::JsonEvaluator;

#[derive(Parser)]
#[command(
    name = "form-pipeline",
    about = "Render forms and map their submissions for workflow runs",
    version
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Settings {
    /// Directory uploaded files are copied into.
    #[arg(long, env = "FORM_STORAGE_DIR", global = true)]
    storage_dir: Option<PathBuf>,

    /// Workflow timezone (IANA name).
    #[arg(long, env = "GENERIC_TIMEZONE", default_value = "UTC", global = true)]
    timezone: String,

    /// Instance id appended to the attribution link.
    #[arg(long, env = "FORM_INSTANCE_ID", global = true)]
    instance_id: Option<String>,
}

impl Settings {
    fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("form-pipeline"))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the render model for a form definition.
    Render {
        /// Path to the form definition JSON file.
        form: PathBuf,
        /// Query parameter prefilling a field, as `key=value`.
        #[arg(long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
        /// Render as a test-run page.
        #[arg(long)]
        test: bool,
    },
    /// Map a submission payload to the record passed downstream.
    Submit {
        /// Path to the form definition JSON file.
        form: PathBuf,
        /// Path to the submission JSON (`data`, `files`, `query`).
        payload: PathBuf,
        #[arg(long, default_value_t = FormMode::Production)]
        mode: FormMode,
        /// Treat the form as a mid-workflow page instead of a trigger.
        #[arg(long)]
        page: bool,
        /// Stamp `submittedAt` in the workflow timezone.
        #[arg(long)]
        use_workflow_timezone: bool,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Expand placeholders in a template.
    Resolve {
        /// Template text; only text starting with `=` is expanded.
        text: String,
        /// JSON exposed to the template as `$json`.
        #[arg(long, default_value = "{}")]
        data: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;

    match cli.command {
        Command::Render { form, query, test } => {
            let config: FormConfig = read_json(&form)?;
            let node = build_node(&settings, config, SubmissionSource::FormTrigger)?;
            let model = node.render(query.into_iter().collect::<BTreeMap<_, _>>(), test, settings.instance_id.as_deref());
            println!("{}", serde_json::to_string_pretty(&model)?);
        }
        Command::Submit { form, payload, mode, page, use_workflow_timezone } => {
            let mut config: FormConfig = read_json(&form)?;
            config.use_workflow_timezone |= use_workflow_timezone;
            let source = if page { SubmissionSource::FormNode } else { SubmissionSource::FormTrigger };
            let node = build_node(&settings, config, source)?;

            let input: serde_json::Value = read_json(&payload)?;
            let mut ctx = ExecutionContext::new(Uuid::new_v4(), settings.timezone.clone());
            ctx.test_run = mode == FormMode::Test;

            info!("submitting to {} node '{}'", source.node_type(), node.id());
            let output = node.execute(input, &ctx).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Validate { path } => {
            let workflow: engine::Workflow = read_json(&path)?;
            let form_nodes = workflow.nodes_of_type(FORM_TRIGGER_NODE_TYPE).count()
                + workflow.nodes_of_type(FORM_NODE_TYPE).count();

            match engine::validate_workflow(&workflow) {
                Ok(order) => {
                    println!("Workflow is valid ({form_nodes} form nodes). Execution order: {order:?}");
                }
                Err(engine::EngineError::ResponseMode { node_id, source }) => {
                    eprintln!("Validation failed for '{node_id}': {source}");
                    eprintln!("{}", source.description());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Resolve { text, data } => {
            let data = serde_json::from_str(&data).context("--data is not valid JSON")?;
            let resolved = forms::resolve_raw_data(&text, &JsonEvaluator::new(data))?;
            println!("{resolved}");
        }
    }

    Ok(())
}

fn build_node(settings: &Settings, config: FormConfig, source: SubmissionSource) -> anyhow::Result<FormNode> {
    let storage = Arc::new(FilesystemStorage::new(settings.storage_dir()));
    let node = FormNode::new(config.form_title.clone(), source, config, storage)
        .context("invalid form definition")?;
    Ok(node)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn parse_key_value(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("expected key=value, got '{raw}'"),
    }
}
