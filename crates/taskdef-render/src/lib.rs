//! Renders an ECS task definition: loads a base document, applies image, family,
//! logging, environment and sizing overrides to one container, and writes the result
//! to a fresh file that outlives the process.

mod error;
mod patch;

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use error::{RenderError, Result};
pub use patch::{apply_overrides, TaskDefOverrides};

pub const OUTPUT_PREFIX: &str = "task-definition-";
pub const OUTPUT_SUFFIX: &str = ".json";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Locations the renderer would otherwise pick up from the process environment.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Root for relative input paths.
    pub workspace: PathBuf,
    /// Directory the rendered file is written into.
    pub temp_dir: PathBuf,
}

pub fn render_task_definition(
    task_definition: &str,
    overrides: &TaskDefOverrides,
    ctx: &RenderContext,
) -> Result<PathBuf> {
    let base_path = resolve_input_path(&ctx.workspace, task_definition);
    if !base_path.try_exists()? {
        return Err(RenderError::FileNotFound {
            kind: "Task definition",
            path: PathBuf::from(task_definition),
        });
    }
    let mut doc = load_json_file(&base_path, "Task definition")?;
    debug!(path = %base_path.display(), "loaded task definition");

    let environment = load_optional(ctx, overrides.environment_file.as_deref(), "Environment")?;
    let secrets = load_optional(ctx, overrides.secrets_file.as_deref(), "Secrets")?;

    apply_overrides(&mut doc, overrides, environment, secrets)?;

    let out = write_task_definition(&ctx.temp_dir, &doc)?;
    info!(
        path = %out.display(),
        family = %overrides.family,
        container = %overrides.container_name,
        "wrote task definition"
    );
    Ok(out)
}

fn load_optional(ctx: &RenderContext, raw: Option<&str>, kind: &'static str) -> Result<Option<Value>> {
    match raw.filter(|s| !s.is_empty()) {
        Some(raw) => {
            let path = resolve_input_path(&ctx.workspace, raw);
            Ok(Some(load_json_file(&path, kind)?))
        }
        None => Ok(None),
    }
}

pub fn resolve_input_path(workspace: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

pub fn load_json_file(path: &Path, kind: &'static str) -> Result<Value> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RenderError::FileNotFound {
            kind,
            path: path.to_path_buf(),
        },
        _ => RenderError::Io(e),
    })?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());
    serde_json::from_slice(body).map_err(|source| RenderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-prints `doc` with two-space indentation and no trailing newline.
pub fn to_pretty_json(doc: &Value) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(RenderError::Serialize)
}

/// Writes `doc` to a new `task-definition-*.json` file under `temp_dir` and returns its
/// absolute path. The file is kept on disk.
pub fn write_task_definition(temp_dir: &Path, doc: &Value) -> Result<PathBuf> {
    let text = to_pretty_json(doc)?;
    fs::create_dir_all(temp_dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(OUTPUT_PREFIX)
        .suffix(OUTPUT_SUFFIX)
        .tempfile_in(temp_dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    let (_, path) = file.keep().map_err(|e| RenderError::Io(e.error))?;
    Ok(if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    })
}
