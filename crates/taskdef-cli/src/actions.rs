//! GitHub Actions workflow-command plumbing: step outputs and failure annotations.

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends `name` to the step output file using the delimiter form, so values
/// containing newlines survive.
pub fn append_output(output_file: &Path, name: &str, value: &str) -> Result<()> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    if name.contains(&delimiter) || value.contains(&delimiter) {
        return Err(anyhow::anyhow!(
            "unexpected input: output value contains the delimiter {}",
            delimiter
        ));
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_file)?;
    write!(file, "{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)?;
    Ok(())
}

pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}
