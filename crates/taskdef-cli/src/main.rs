mod actions;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use taskdef_render::{RenderContext, TaskDefOverrides};
use tracing::error;
use tracing_subscriber::EnvFilter;

const OUTPUT_NAME: &str = "task-definition";

/// Inputs fall back to the `INPUT_*` variables GitHub Actions sets for an action step.
#[derive(Parser, Debug)]
#[command(
    name = "render-task-def",
    version,
    about = "Render an ECS task definition with a new image, family and runtime overrides"
)]
struct Cli {
    #[arg(long, env = "INPUT_TASK-DEFINITION")]
    task_definition: Option<String>,
    #[arg(long, env = "INPUT_CONTAINER-NAME")]
    container_name: Option<String>,
    #[arg(long, env = "INPUT_IMAGE")]
    image: Option<String>,
    #[arg(long, env = "INPUT_TASK-FAMILY")]
    task_family: Option<String>,
    #[arg(long, env = "INPUT_ENTRY-POINT")]
    entry_point: Option<String>,
    #[arg(long, env = "INPUT_LOG-GROUP")]
    log_group: Option<String>,
    #[arg(long, env = "INPUT_MEMORY")]
    memory: Option<String>,
    #[arg(long, env = "INPUT_CPU")]
    cpu: Option<String>,
    #[arg(long = "ephemeral-storage-size-in-gib", env = "INPUT_EPHEMERAL-STORAGE-SIZE-IN-GIB")]
    ephemeral_storage_size_in_gib: Option<String>,
    #[arg(long, env = "INPUT_ENVIRONMENT-FILE")]
    environment_file: Option<String>,
    #[arg(long, env = "INPUT_SECRETS-FILE")]
    secrets_file: Option<String>,

    /// Root for relative input paths (default: current directory).
    #[arg(long, env = "GITHUB_WORKSPACE")]
    workspace: Option<PathBuf>,
    /// Directory receiving the rendered file (default: system temp dir).
    #[arg(long, env = "RUNNER_TEMP")]
    temp_dir: Option<PathBuf>,
    /// Step output file; `task-definition` is appended to it when set.
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RenderReport {
    ok: bool,
    command: &'static str,
    task_definition: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    match run(cli) {
        Ok(path) => {
            if json_mode {
                emit_json(&RenderReport {
                    ok: true,
                    command: "render",
                    task_definition: path.display().to_string(),
                });
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "render failed");
            if json_mode {
                emit_json(&json_error("command_failed", err.to_string(), json!({})));
            } else {
                println!("{}", actions::error_command(&err.to_string()));
            }
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<PathBuf> {
    let task_definition = required_input(cli.task_definition, "task-definition")?;
    let overrides = TaskDefOverrides {
        container_name: required_input(cli.container_name, "container-name")?,
        image: required_input(cli.image, "image")?,
        family: required_input(cli.task_family, "task-family")?,
        entry_point: optional_input(cli.entry_point),
        log_group: optional_input(cli.log_group),
        memory: optional_input(cli.memory),
        cpu: optional_input(cli.cpu),
        ephemeral_storage_gib: optional_input(cli.ephemeral_storage_size_in_gib),
        environment_file: optional_input(cli.environment_file),
        secrets_file: optional_input(cli.secrets_file),
    };
    let ctx = RenderContext {
        workspace: match cli.workspace {
            Some(ws) => ws,
            None => std::env::current_dir()?,
        },
        temp_dir: cli.temp_dir.unwrap_or_else(std::env::temp_dir),
    };

    let path = taskdef_render::render_task_definition(&task_definition, &overrides, &ctx)?;
    if let Some(output_file) = cli.github_output.as_deref() {
        actions::append_output(output_file, OUTPUT_NAME, &path.display().to_string())?;
    }
    Ok(path)
}

fn optional_input(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_input(value: Option<String>, name: &str) -> Result<String> {
    optional_input(value).ok_or_else(|| anyhow!("Input required and not supplied: {}", name))
}

fn emit_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}
