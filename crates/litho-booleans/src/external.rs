//! Subprocess backend speaking the file protocol in [`crate::protocol`].
//!
//! Every call gets its own temporary directory holding the operand STLs,
//! the config, the engine log and the result. The directory is removed when
//! the call returns, whatever the outcome.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use litho_mesh::{load_stl, save_stl, TriangleMesh};
use litho_pipeline::CancellationToken;
use log::{debug, info, warn};

use crate::engine::BooleanEngine;
use crate::error::{BooleanError, Result};
use crate::operation::{BooleanOperation, Operand};
use crate::protocol::{
    write_config, OperandRecord, OperationRecord, CONFIG_FILE_NAME, RESULT_FILE_NAME,
};

/// Blender's background-mode and run-script flags.
pub const DEFAULT_BATCH_ARGS: [&str; 2] = ["-b", "-P"];

/// Time the engine gets before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Script handed to Blender when none is configured.
pub const BUNDLED_SCRIPT: &str = include_str!("../scripts/blender_boolean.py");

/// File name of the bundled script inside the per-call directory.
pub const BUNDLED_SCRIPT_NAME: &str = "blender_boolean.py";

const LOG_FILE_NAME: &str = "engine.log";
const LOG_TAIL_LINES: usize = 20;

/// Runs `<executable> <batch args…> <script> -- <config> <output>`.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    executable: PathBuf,
    batch_args: Vec<String>,
    script: Option<PathBuf>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ExternalEngine {
    /// Engine at `executable` with Blender's defaults.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            batch_args: DEFAULT_BATCH_ARGS.iter().map(|s| s.to_string()).collect(),
            script: None,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Replace the arguments placed before the script path.
    pub fn with_batch_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.batch_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Use a script on disk instead of the bundled one.
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Change the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change how often the running engine is checked.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Engine executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments placed before the script path.
    pub fn batch_args(&self) -> &[String] {
        &self.batch_args
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn write_operands(
        &self,
        dir: &Path,
        operations: &[BooleanOperation<'_>],
    ) -> Result<Vec<OperationRecord>> {
        operations
            .iter()
            .enumerate()
            .map(|(i, op)| {
                let left = match op.left {
                    Operand::Mesh(mesh) => {
                        let name = if i == 0 {
                            "base".to_string()
                        } else {
                            format!("left_{:02}", i + 1)
                        };
                        OperandRecord::file(write_operand(dir, &name, mesh)?)
                    }
                    Operand::PriorResult => OperandRecord::Outcome,
                };
                let right_name = format!("{:02}_{}", i + 1, file_safe(op.name));
                let right = OperandRecord::file(write_operand(dir, &right_name, op.right)?);
                Ok(OperationRecord {
                    mode: op.mode,
                    left,
                    right,
                })
            })
            .collect()
    }

    fn script_path(&self, dir: &Path) -> Result<PathBuf> {
        if let Some(script) = &self.script {
            return Ok(script.clone());
        }
        let path = dir.join(BUNDLED_SCRIPT_NAME);
        fs::write(&path, BUNDLED_SCRIPT).map_err(|e| BooleanError::io(&path, e))?;
        Ok(path)
    }

    fn run(
        &self,
        dir: &Path,
        script: &Path,
        config: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let log_path = dir.join(LOG_FILE_NAME);
        let stdout = File::create(&log_path).map_err(|e| BooleanError::io(&log_path, e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| BooleanError::io(&log_path, e))?;

        let mut command = Command::new(&self.executable);
        command
            .args(&self.batch_args)
            .arg(script)
            .arg("--")
            .arg(config)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        debug!("running {command:?}");

        let mut child = command.spawn().map_err(|e| {
            BooleanError::ExternalTool(format!("cannot start {}: {e}", self.executable.display()))
        })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    stop(&mut child);
                    return Err(BooleanError::ExternalTool(format!(
                        "cannot wait for engine: {e}"
                    )));
                }
            }
            if cancel.is_cancelled() {
                warn!("cancelling boolean engine");
                stop(&mut child);
                return Err(BooleanError::Cancelled);
            }
            if started.elapsed() >= self.timeout {
                stop(&mut child);
                return Err(BooleanError::ExternalTool(format!(
                    "engine timed out after {:.1} s",
                    self.timeout.as_secs_f64()
                )));
            }
            thread::sleep(self.poll_interval);
        };

        debug!(
            "engine finished with {status} after {:.3} s",
            started.elapsed().as_secs_f64()
        );
        if status.success() {
            Ok(())
        } else {
            Err(BooleanError::ExternalTool(format!(
                "engine exited with {status}{}",
                log_tail(&log_path)
            )))
        }
    }
}

impl BooleanEngine for ExternalEngine {
    fn name(&self) -> &str {
        "external"
    }

    fn apply(
        &self,
        operations: &[BooleanOperation<'_>],
        cancel: &CancellationToken,
    ) -> Result<TriangleMesh> {
        if self.executable.as_os_str().is_empty() {
            return Err(BooleanError::EngineNotConfigured);
        }
        cancel.check()?;

        let dir = tempfile::Builder::new()
            .prefix("litho-boolean-")
            .tempdir()
            .map_err(|e| BooleanError::io(std::env::temp_dir(), e))?;

        let records = self.write_operands(dir.path(), operations)?;
        let config = dir.path().join(CONFIG_FILE_NAME);
        write_config(&records, &config)?;
        let script = self.script_path(dir.path())?;
        let output = dir.path().join(RESULT_FILE_NAME);

        info!(
            "running {} for {} operations",
            self.executable.display(),
            records.len()
        );
        self.run(dir.path(), &script, &config, &output, cancel)?;

        if !output.is_file() {
            return Err(BooleanError::ExternalTool(format!(
                "engine wrote no result to {}",
                output.display()
            )));
        }
        Ok(load_stl(&output)?)
    }
}

fn write_operand(dir: &Path, name: &str, mesh: &TriangleMesh) -> Result<PathBuf> {
    let path = dir.join(format!("{name}.stl"));
    save_stl(mesh, &path)?;
    Ok(path)
}

fn file_safe(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "feature".to_string()
    } else {
        cleaned
    }
}

fn stop(child: &mut Child) {
    // Already exited is fine
    let _ = child.kill();
    let _ = child.wait();
}

fn log_tail(path: &Path) -> String {
    let Ok(bytes) = fs::read(path) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let tail = &lines[lines.len().saturating_sub(LOG_TAIL_LINES)..];
    if tail.is_empty() {
        String::new()
    } else {
        format!(":\n{}", tail.join("\n"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::operation::{plan, BooleanMode, FeatureMesh};
    use crate::protocol::read_config;
    use litho_mesh::Point3;

    fn cube(min: f64, max: f64) -> TriangleMesh {
        TriangleMesh::cuboid(Point3::new(min, min, min), Point3::new(max, max, max))
    }

    /// Engine that runs `sh -c <body> <script> -- <config> <output>`, so the
    /// body sees the script as `$0`, the config as `$2` and the output as `$3`.
    fn shell_engine(body: &str) -> ExternalEngine {
        ExternalEngine::new("sh")
            .with_batch_args(["-c", body])
            .with_poll_interval(Duration::from_millis(5))
    }

    fn features() -> Vec<FeatureMesh> {
        vec![
            FeatureMesh::additive("Stand", cube(1.0, 3.0)),
            FeatureMesh::subtractive("Off", cube(0.0, 1.0)).with_enabled(false),
            FeatureMesh::subtractive("Corner hole", cube(2.5, 4.0)),
        ]
    }

    #[test]
    fn test_protocol_files_and_cleanup() {
        let scratch = tempfile::tempdir().unwrap();
        let prepared = scratch.path().join("prepared.stl");
        save_stl(&cube(0.0, 5.0), &prepared).unwrap();
        let captured = scratch.path().join("captured.json");
        let captured_script = scratch.path().join("script.py");
        let workdir = scratch.path().join("workdir.txt");

        let body = format!(
            "cp \"$2\" '{}' && cp \"$0\" '{}' && dirname \"$2\" > '{}' && cp '{}' \"$3\"",
            captured.display(),
            captured_script.display(),
            workdir.display(),
            prepared.display()
        );
        let base = cube(0.0, 2.0);
        let features = features();
        let result = shell_engine(&body)
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.num_triangles(), 12);

        let records = read_config(&captured).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mode, BooleanMode::Union);
        assert!(matches!(&records[0].left, OperandRecord::File { file } if file.ends_with("base.stl")));
        assert!(matches!(&records[0].right, OperandRecord::File { file } if file.ends_with("01_Stand.stl")));
        assert_eq!(records[1].left, OperandRecord::Outcome);
        assert_eq!(records[1].mode, BooleanMode::Difference);
        assert!(matches!(&records[1].right, OperandRecord::File { file } if file.ends_with("02_Corner_hole.stl")));

        assert_eq!(fs::read_to_string(&captured_script).unwrap(), BUNDLED_SCRIPT);

        let dir = fs::read_to_string(&workdir).unwrap();
        assert!(!Path::new(dir.trim()).exists(), "temp dir left behind");
    }

    #[test]
    fn test_configured_script_is_passed() {
        let scratch = tempfile::tempdir().unwrap();
        let prepared = scratch.path().join("prepared.stl");
        save_stl(&cube(0.0, 1.0), &prepared).unwrap();
        let body = format!(
            "test \"$0\" = /opt/custom.py && cp '{}' \"$3\"",
            prepared.display()
        );
        let base = cube(0.0, 2.0);
        let features = features();
        shell_engine(&body)
            .with_script("/opt/custom.py")
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap();
    }

    #[test]
    fn test_non_zero_exit_reports_log() {
        let base = cube(0.0, 2.0);
        let features = features();
        let err = shell_engine("echo 'boolean modifier failed' >&2; exit 3")
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap_err();
        match err {
            BooleanError::ExternalTool(msg) => assert!(msg.contains("boolean modifier failed"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_output() {
        let base = cube(0.0, 2.0);
        let features = features();
        let err = shell_engine("exit 0")
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, BooleanError::ExternalTool(msg) if msg.contains("no result")));
    }

    #[test]
    fn test_timeout_kills_engine() {
        let base = cube(0.0, 2.0);
        let features = features();
        let started = Instant::now();
        let err = shell_engine("sleep 10")
            .with_timeout(Duration::from_millis(100))
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, BooleanError::ExternalTool(msg) if msg.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_kills_engine() {
        let base = cube(0.0, 2.0);
        let features = features();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = shell_engine("sleep 10")
            .apply(&plan(&base, &features), &token)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, BooleanError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_spawn_failure() {
        let base = cube(0.0, 2.0);
        let features = features();
        let err = ExternalEngine::new("/nonexistent/litho-engine")
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, BooleanError::ExternalTool(msg) if msg.contains("cannot start")));
    }

    #[test]
    fn test_empty_executable_not_configured() {
        let base = cube(0.0, 2.0);
        let features = features();
        let err = ExternalEngine::new("")
            .apply(&plan(&base, &features), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, BooleanError::EngineNotConfigured));
    }

    #[test]
    fn test_defaults() {
        let engine = ExternalEngine::new("blender");
        assert_eq!(engine.batch_args().to_vec(), vec!["-b", "-P"]);
        assert_eq!(engine.timeout(), Duration::from_secs(600));
        assert_eq!(engine.executable(), Path::new("blender"));
    }

    #[test]
    fn test_file_safe_names() {
        assert_eq!(file_safe("Corner hole"), "Corner_hole");
        assert_eq!(file_safe("../etc"), "___etc");
        assert_eq!(file_safe(""), "feature");
    }
}
