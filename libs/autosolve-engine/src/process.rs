// Child-process sandbox
//
// Each run gets its own temp dir, a cleared environment and no stdin.
// There are no memory or CPU limits here; use the docker backend for
// untrusted traffic.
use crate::engine::{OutputBuffer, RawRun, SandboxEngine};
use anyhow::{Context, Result};
use async_trait::async_trait;
use autosolve_common::config::SandboxConfig;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
const READ_CHUNK: usize = 4096;

pub struct ProcessEngine {
    config: SandboxConfig,
}

impl ProcessEngine {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxEngine for ProcessEngine {
    async fn run(&self, code: &str) -> Result<RawRun> {
        let workspace = tempfile::Builder::new()
            .prefix("autosolve-")
            .tempdir()
            .context("Failed to create sandbox directory")?;

        let program_path = workspace.path().join(&self.config.file_name);
        tokio::fs::write(&program_path, code)
            .await
            .context("Failed to write program file")?;

        let (command, args) = self
            .config
            .interpreter
            .split_first()
            .context("Sandbox interpreter is empty")?;

        let mut child = Command::new(command)
            .args(args)
            .arg(&program_path)
            .current_dir(workspace.path())
            .env_clear()
            .env("PATH", SANDBOX_PATH)
            .env("HOME", workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn interpreter '{}'", command))?;

        debug!(pid = child.id(), dir = %workspace.path().display(), "Spawned sandboxed process");

        let mut stdout = child.stdout.take().context("Child stdout not captured")?;
        let mut stderr = child.stderr.take().context("Child stderr not captured")?;
        let mut buffer = OutputBuffer::new(self.config.max_output_bytes);
        let start_time = Instant::now();

        // Both streams land in one buffer in the order they arrive
        let execution_future = async {
            let mut out_chunk = [0u8; READ_CHUNK];
            let mut err_chunk = [0u8; READ_CHUNK];
            let mut out_open = true;
            let mut err_open = true;

            while out_open || err_open {
                tokio::select! {
                    read = stdout.read(&mut out_chunk), if out_open => match read {
                        Ok(0) | Err(_) => out_open = false,
                        Ok(n) => buffer.push(&out_chunk[..n]),
                    },
                    read = stderr.read(&mut err_chunk), if err_open => match read {
                        Ok(0) | Err(_) => err_open = false,
                        Ok(n) => buffer.push(&err_chunk[..n]),
                    },
                }
            }

            child.wait().await
        };

        let timeout_duration = Duration::from_millis(self.config.timeout_ms);
        let timeout_result = tokio::time::timeout(timeout_duration, execution_future).await;

        let (exit_code, timed_out) = match timeout_result {
            Ok(Ok(status)) => (status.code().map(i64::from), false),
            Ok(Err(e)) => return Err(e).context("Failed to wait for sandboxed process"),
            Err(_) => {
                warn!(timeout_ms = self.config.timeout_ms, "Execution timed out, killing process");
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                let _ = child.wait().await;
                (None, true)
            }
        };

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        let (output, truncated) = buffer.into_string();

        Ok(RawRun {
            output,
            exit_code,
            timed_out,
            truncated,
            execution_time_ms,
        })
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
