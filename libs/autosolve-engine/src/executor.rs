/// Sandboxed Executor - Classification Around a Sandbox Engine
///
/// **Responsibility:**
/// Guard the engine against text that is not a program, then turn the raw
/// run into Output, Empty or Failure.
///
/// This module knows nothing about:
/// - How isolation works (engine's job)
/// - Where the code came from (pipeline's job)

use crate::engine::{engine_from_config, RawRun, SandboxEngine, TRUNCATION_NOTICE};
use crate::error::SolveError;
use anyhow::Result;
use autosolve_common::config::SandboxConfig;
use autosolve_common::types::{ExecutionResult, FAILURE_MARKER};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Programs above this size are refused before reaching the sandbox.
/// Keeps the base64 environment variable under the kernel's per-string limit.
pub const MAX_SOURCE_CODE_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct Executor {
    engine: Arc<dyn SandboxEngine>,
}

impl Executor {
    pub fn new(engine: Arc<dyn SandboxEngine>) -> Self {
        Self { engine }
    }

    pub fn from_config(config: &SandboxConfig) -> Result<Self> {
        Ok(Self::new(engine_from_config(config)?))
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Run one program. Never fails: every fault becomes `ExecutionResult::Failure`.
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        if code.trim().is_empty() || code.starts_with(FAILURE_MARKER) {
            debug!("Refusing to execute empty code or upstream error text");
            return ExecutionResult::Failure(format!("Invalid code returned: {}", code));
        }

        if code.len() > MAX_SOURCE_CODE_BYTES {
            return ExecutionResult::Failure(
                SolveError::ExecutionFault(format!(
                    "source code exceeds maximum size of {} bytes",
                    MAX_SOURCE_CODE_BYTES
                ))
                .to_string(),
            );
        }

        debug!(engine = self.engine.name(), code = %code, "Executing generated code");

        match self.engine.run(code).await {
            Ok(run) => {
                info!(
                    engine = self.engine.name(),
                    exit_code = ?run.exit_code,
                    timed_out = run.timed_out,
                    execution_ms = run.execution_time_ms,
                    output_size = run.output.len(),
                    "Execution finished"
                );
                classify(run)
            }
            Err(e) => {
                let description = format!("sandbox failure: {:#}", e);
                warn!(engine = self.engine.name(), error = %description, "Sandbox failure");
                ExecutionResult::Failure(SolveError::ExecutionFault(description).to_string())
            }
        }
    }
}

/// Turn a raw run into the result the report shows
pub fn classify(run: RawRun) -> ExecutionResult {
    let mut captured = run.output.trim_end().to_string();
    if run.truncated {
        captured.push_str(TRUNCATION_NOTICE);
    }

    let fault = if run.timed_out {
        Some(format!("execution timed out after {}ms", run.execution_time_ms))
    } else {
        match run.exit_code {
            Some(0) => None,
            Some(code) => Some(format!("program exited with status {}", code)),
            None => Some("program terminated without an exit status".to_string()),
        }
    };

    match fault {
        Some(description) if captured.trim().is_empty() => {
            ExecutionResult::Failure(SolveError::ExecutionFault(description).to_string())
        }
        Some(description) => ExecutionResult::Failure(
            SolveError::ExecutionFault(format!("{}\n{}", description, captured)).to_string(),
        ),
        None if captured.trim().is_empty() => ExecutionResult::Empty,
        None => ExecutionResult::Output(captured),
    }
}
