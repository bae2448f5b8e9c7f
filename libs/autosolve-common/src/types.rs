use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix carried by every failure string the pipeline produces.
/// The executor refuses to run anything that starts with it.
pub const FAILURE_MARKER: &str = "Error";

/// Rendering of [`ExecutionResult::Empty`] inside reports.
pub const NO_OUTPUT_MESSAGE: &str = "Error: Code execution produced no output.";

/// Outcome of asking the generation service for a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GenerationResult {
    Success(String),
    Failure(String),
}

impl GenerationResult {
    /// Failure reasons are normalized so they always begin with [`FAILURE_MARKER`]
    pub fn failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.starts_with(FAILURE_MARKER) {
            GenerationResult::Failure(reason)
        } else {
            GenerationResult::Failure(format!("{}: {}", FAILURE_MARKER, reason))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    /// Code on success, the failure reason otherwise
    pub fn as_text(&self) -> &str {
        match self {
            GenerationResult::Success(code) => code,
            GenerationResult::Failure(reason) => reason,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            GenerationResult::Success(code) => code,
            GenerationResult::Failure(reason) => reason,
        }
    }
}

/// Outcome of running one generated program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExecutionResult {
    Output(String),
    /// The program ran without fault but wrote nothing
    Empty,
    Failure(String),
}

impl ExecutionResult {
    pub fn as_text(&self) -> &str {
        match self {
            ExecutionResult::Output(text) => text,
            ExecutionResult::Empty => NO_OUTPUT_MESSAGE,
            ExecutionResult::Failure(reason) => reason,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ExecutionResult::Output(text) => text,
            ExecutionResult::Empty => NO_OUTPUT_MESSAGE.to_string(),
            ExecutionResult::Failure(reason) => reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Solved,
    GenerationFailed,
    ExecutionFailed,
    NoOutput,
}

impl ItemStatus {
    pub fn classify(generation: &GenerationResult, execution: &ExecutionResult) -> Self {
        match (generation, execution) {
            (GenerationResult::Failure(_), _) => ItemStatus::GenerationFailed,
            (_, ExecutionResult::Failure(_)) => ItemStatus::ExecutionFailed,
            (_, ExecutionResult::Empty) => ItemStatus::NoOutput,
            (_, ExecutionResult::Output(_)) => ItemStatus::Solved,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemStatus::Solved => "solved",
            ItemStatus::GenerationFailed => "generation_failed",
            ItemStatus::ExecutionFailed => "execution_failed",
            ItemStatus::NoOutput => "no_output",
        };
        write!(f, "{}", label)
    }
}

/// Per-question record handed to the report renderer.
///
/// `code` holds the generated program or the generation error string,
/// `output` holds the captured output or the execution error string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    pub question: String,
    pub code: String,
    pub output: String,
    pub status: ItemStatus,
}

impl BatchItem {
    pub fn new(
        index: usize,
        question: impl Into<String>,
        generation: GenerationResult,
        execution: ExecutionResult,
    ) -> Self {
        let status = ItemStatus::classify(&generation, &execution);
        Self {
            index,
            question: question.into(),
            code: generation.into_text(),
            output: execution.into_text(),
            status,
        }
    }
}
