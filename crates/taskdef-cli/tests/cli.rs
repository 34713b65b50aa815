use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const BASE: &str = r#"{"family":"old","containerDefinitions":[{"name":"web","image":"old:1","logConfiguration":{"options":{}}}]}"#;

struct Step {
    _root: TempDir,
    workspace: PathBuf,
    runner_temp: PathBuf,
    github_output: PathBuf,
}

impl Step {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let workspace = root.path().join("workspace");
        fs::create_dir_all(&workspace).expect("workspace");
        fs::write(workspace.join("task-def.json"), BASE).expect("base");
        Step {
            workspace,
            runner_temp: root.path().join("runner-temp"),
            github_output: root.path().join("github_output"),
            _root: root,
        }
    }

    /// Runs the binary the way an action step does: every input comes from the environment.
    fn run(&self, inputs: &[(&str, &str)], args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_render-task-def"));
        cmd.env_clear()
            .env("GITHUB_WORKSPACE", &self.workspace)
            .env("RUNNER_TEMP", &self.runner_temp)
            .env("GITHUB_OUTPUT", &self.github_output)
            .args(args);
        for (name, value) in inputs {
            cmd.env(format!("INPUT_{}", name.to_uppercase()), value);
        }
        cmd.output().expect("spawn render-task-def")
    }

    fn written_files(&self) -> usize {
        fs::read_dir(&self.runner_temp)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8 stdout")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("parse")
}

#[test]
fn inputs_from_environment_render_into_runner_temp() {
    let step = Step::new();
    let output = step.run(
        &[
            ("task-definition", "task-def.json"),
            ("container-name", "web"),
            ("image", "repo/web:2"),
            ("task-family", "fam1"),
            ("entry-point", "a b c"),
            ("log-group", "   "),
            ("ephemeral-storage-size-in-gib", "20"),
        ],
        &[],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let out = stdout(&output);
    let path = PathBuf::from(out.trim_end());
    assert!(path.starts_with(&step.runner_temp));

    let doc = read_json(&path);
    let web = &doc["containerDefinitions"][0];
    assert_eq!(doc["family"], "fam1");
    assert_eq!(web["image"], "repo/web:2");
    assert_eq!(web["entryPoint"], serde_json::json!(["a", "b", "c"]));
    assert_eq!(web["logConfiguration"]["options"]["awslogs-group"], "/ecs/fam1");
    assert_eq!(doc["ephemeralStorage"]["sizeInGiB"], 20);

    let step_output = fs::read_to_string(&step.github_output).expect("github output");
    assert!(step_output.starts_with("task-definition<<ghadelimiter_"));
    assert!(step_output.contains(&format!("\n{}\n", path.display())));
}

#[test]
fn failure_prints_error_command_and_exits_nonzero() {
    let step = Step::new();
    let output = step.run(
        &[
            ("task-definition", "task-def.json"),
            ("container-name", "worker"),
            ("image", "repo/web:2"),
            ("task-family", "fam1"),
        ],
        &[],
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "::error::Invalid task definition: Could not find container definition with matching name\n"
    );
    assert_eq!(step.written_files(), 0);
    assert!(!step.github_output.exists());
}

#[test]
fn json_mode_reports_success_envelope() {
    let step = Step::new();
    let output = step.run(
        &[
            ("task-definition", "task-def.json"),
            ("container-name", "web"),
            ("image", "repo/web:2"),
            ("task-family", "fam1"),
        ],
        &["--json"],
    );
    assert!(output.status.success());

    let report: Value = serde_json::from_str(stdout(&output).trim_end()).expect("json line");
    assert_eq!(report["ok"], true);
    assert_eq!(report["command"], "render");
    let path = PathBuf::from(report["task_definition"].as_str().expect("path"));
    assert!(path.starts_with(&step.runner_temp));
    assert_eq!(read_json(&path)["family"], "fam1");
}

#[test]
fn json_mode_reports_missing_required_input() {
    let step = Step::new();
    let output = step.run(
        &[
            ("task-definition", "task-def.json"),
            ("container-name", "web"),
            ("image", "repo/web:2"),
        ],
        &["--json"],
    );
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_str(stdout(&output).trim_end()).expect("json line");
    assert_eq!(
        report,
        serde_json::json!({
            "ok": false,
            "error": {
                "code": "command_failed",
                "message": "Input required and not supplied: task-family",
                "details": {}
            }
        })
    );
    assert_eq!(step.written_files(), 0);
    assert!(!step.github_output.exists());
}
