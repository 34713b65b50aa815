use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Default)]
pub struct TaskDefOverrides {
    pub container_name: String,
    pub image: String,
    pub family: String,
    pub entry_point: Option<String>,
    pub log_group: Option<String>,
    pub memory: Option<String>,
    pub cpu: Option<String>,
    pub ephemeral_storage_gib: Option<String>,
    pub environment_file: Option<String>,
    pub secrets_file: Option<String>,
}

impl TaskDefOverrides {
    pub fn new(
        container_name: impl Into<String>,
        image: impl Into<String>,
        family: impl Into<String>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            image: image.into(),
            family: family.into(),
            ..Self::default()
        }
    }

    pub fn default_log_group(&self) -> String {
        format!("/ecs/{}", self.family)
    }
}

/// Applies `overrides` to a parsed task definition in place.
///
/// `environment` and `secrets` are the already-loaded contents of the
/// environment and secrets files; when present they replace the container's
/// values wholesale.
pub fn apply_overrides(
    doc: &mut Value,
    overrides: &TaskDefOverrides,
    environment: Option<Value>,
    secrets: Option<Value>,
) -> Result<()> {
    let root = doc
        .as_object_mut()
        .ok_or_else(RenderError::missing_container_definitions)?;

    root.insert("family".to_string(), Value::String(overrides.family.clone()));

    let containers = root
        .get_mut("containerDefinitions")
        .and_then(Value::as_array_mut)
        .ok_or_else(RenderError::missing_container_definitions)?;
    let container = containers
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|c| c.get("name").and_then(Value::as_str) == Some(overrides.container_name.as_str()))
        .ok_or_else(RenderError::container_not_found)?;

    container.insert("image".to_string(), Value::String(overrides.image.clone()));
    debug!(container = %overrides.container_name, image = %overrides.image, "set image");

    if let Some(entry_point) = non_empty(&overrides.entry_point) {
        let tokens: Vec<Value> = entry_point
            .split(' ')
            .map(|t| Value::String(t.to_string()))
            .collect();
        container.insert("entryPoint".to_string(), Value::Array(tokens));
        debug!(entry_point, "set entryPoint");
    }

    let log_group = non_empty(&overrides.log_group)
        .map(str::to_string)
        .unwrap_or_else(|| overrides.default_log_group());
    let options = log_options_mut(container).ok_or_else(|| RenderError::MissingLogOptions {
        container: overrides.container_name.clone(),
    })?;
    debug!(log_group = %log_group, "set awslogs-group");
    options.insert("awslogs-group".to_string(), Value::String(log_group));

    if let Some(environment) = environment {
        container.insert("environment".to_string(), environment);
    }
    if let Some(secrets) = secrets {
        container.insert("secrets".to_string(), secrets);
    }

    if let Some(memory) = non_empty(&overrides.memory) {
        root.insert("memory".to_string(), Value::String(memory.to_string()));
    }
    if let Some(cpu) = non_empty(&overrides.cpu) {
        root.insert("cpu".to_string(), Value::String(cpu.to_string()));
    }
    if let Some(raw) = non_empty(&overrides.ephemeral_storage_gib) {
        let size = parse_leading_int(raw).unwrap_or(Value::Null);
        root.insert("ephemeralStorage".to_string(), json!({ "sizeInGiB": size }));
    }

    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn log_options_mut(container: &mut Map<String, Value>) -> Option<&mut Map<String, Value>> {
    container
        .get_mut("logConfiguration")?
        .get_mut("options")?
        .as_object_mut()
}

/// Reads a base-10 integer from the start of `raw`, ignoring anything after the digits.
/// Returns `None` when no digits are present. Magnitudes beyond `i64` come back as a
/// float; past `f64` range they become `null`.
fn parse_leading_int(raw: &str) -> Option<Value> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let digits = &rest[..digits_len];
    if let Ok(magnitude) = digits.parse::<i64>() {
        return Some(Value::from(if negative { -magnitude } else { magnitude }));
    }
    let magnitude: f64 = digits.parse().ok()?;
    Some(Value::from(if negative { -magnitude } else { magnitude }))
}
