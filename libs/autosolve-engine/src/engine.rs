/// Sandbox Engine - Isolated Execution of Generated Programs
///
/// **Core Responsibility:**
/// Run one program body in a fresh isolated context and capture its
/// combined stdout/stderr.
///
/// **Boundary:**
/// - Engine knows HOW to isolate (container, child process)
/// - Engine does NOT decide what counts as output, empty or failure
/// - The Executor classifies the raw run
///
/// Backends: `DockerEngine` (default) and `ProcessEngine`.

use anyhow::Result;
use async_trait::async_trait;
use autosolve_common::config::{SandboxBackend, SandboxConfig};
use std::sync::Arc;

pub use crate::docker::DockerEngine;
pub use crate::process::ProcessEngine;

/// Appended when the captured output hit the byte cap
pub const TRUNCATION_NOTICE: &str = "\n[output truncated]";

/// Raw result of one sandboxed run, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRun {
    /// stdout and stderr merged in arrival order
    pub output: String,
    pub exit_code: Option<i64>,
    pub timed_out: bool,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

#[async_trait]
pub trait SandboxEngine: Send + Sync {
    /// Execute `code` in a context that shares nothing with previous runs.
    /// `Err` means the sandbox itself failed, not the program.
    async fn run(&self, code: &str) -> Result<RawRun>;

    fn name(&self) -> &'static str;
}

/// Build the engine selected by configuration
pub fn engine_from_config(config: &SandboxConfig) -> Result<Arc<dyn SandboxEngine>> {
    match config.backend {
        SandboxBackend::Docker => Ok(Arc::new(DockerEngine::new(config.clone())?)),
        SandboxBackend::Process => Ok(Arc::new(ProcessEngine::new(config.clone()))),
    }
}

/// Byte buffer with a hard cap, allocated fresh for every run
#[derive(Debug)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Decode as UTF-8, replacing invalid sequences
    pub fn into_string(self) -> (String, bool) {
        (String::from_utf8_lossy(&self.bytes).into_owned(), self.truncated)
    }
}
