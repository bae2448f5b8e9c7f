// In-crate fakes for the generator and sandbox seams
use crate::engine::{RawRun, SandboxEngine};
use crate::generation::CodeGenerator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use autosolve_common::types::GenerationResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns a fixed result per question; unknown questions panic
pub struct ScriptedGenerator {
    answers: HashMap<String, GenerationResult>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(answers: Vec<(&str, GenerationResult)>) -> Self {
        Self {
            answers: answers
                .into_iter()
                .map(|(question, result)| (question.to_string(), result))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    async fn generate(&self, question: &str) -> GenerationResult {
        self.calls.lock().unwrap().push(question.to_string());
        match self.answers.get(question) {
            Some(result) => result.clone(),
            None => panic!("no scripted answer for {:?}", question),
        }
    }
}

enum Behaviour {
    Return(RawRun),
    Fail(String),
    /// Echo the code back as output
    Echo,
}

/// Counts runs and answers with a canned result
pub struct RecordingEngine {
    behaviour: Behaviour,
    runs: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl RecordingEngine {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            runs: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(run: RawRun) -> Self {
        Self::with(Behaviour::Return(run))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Behaviour::Fail(message.to_string()))
    }

    pub fn echoing() -> Self {
        Self::with(Behaviour::Echo)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SandboxEngine for RecordingEngine {
    async fn run(&self, code: &str) -> Result<RawRun> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(code.to_string());
        match &self.behaviour {
            Behaviour::Return(run) => Ok(run.clone()),
            Behaviour::Fail(message) => Err(anyhow!("{}", message)),
            Behaviour::Echo => Ok(RawRun {
                output: format!("{}\n", code),
                exit_code: Some(0),
                timed_out: false,
                truncated: false,
                execution_time_ms: 1,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
