//! Prompt construction and response cleanup for the generation service.
//!
//! The interactive-input handling here is a heuristic: a question that
//! mentions "input" or "user" gets a small synthetic value so the model
//! hard-codes it instead of reading stdin. It says nothing about whether
//! that value makes sense for the problem.

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

/// Call that would block on stdin inside the sandbox
pub const INTERACTIVE_INPUT_CALL: &str = "input(";

const INTERACTIVE_CUES: [&str; 2] = ["input", "user"];

/// Synthetic values are drawn from this range
pub const SYNTHETIC_INPUT_RANGE: std::ops::RangeInclusive<u8> = 1..=7;

pub fn expects_interactive_input(question: &str) -> bool {
    let lowered = question.to_lowercase();
    INTERACTIVE_CUES.iter().any(|cue| lowered.contains(cue))
}

/// Substitute one synthetic input value when the question asks for user input.
/// The value is drawn once, so it stays fixed for the whole request.
pub fn augment_question<R: Rng + ?Sized>(question: &str, rng: &mut R) -> String {
    if !expects_interactive_input(question) {
        return question.to_string();
    }
    let value = rng.gen_range(SYNTHETIC_INPUT_RANGE);
    format!(
        "{} Assume the user input is {}. The code should NOT prompt for input.",
        question, value
    )
}

pub fn build_prompt(question: &str, language: &str) -> String {
    format!(
        "Write only the {language} code to solve the following problem: {question}.\n\
         The code must NOT contain any 'input()' function or request user input.\n\
         Instead, assume predefined values for any required inputs.\n\
         Do not include any explanations, comments, or unnecessary imports. \
         Just provide the clean {language} code."
    )
}

// A fence with an optional language tag. The tag only counts when
// whitespace or the line end follows it, so "```print(1)```" keeps `print`.
fn fence_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)```(?:[A-Za-z0-9_+-]+(?:[ \t]|$))?").expect("fence regex"))
}

/// Remove every markdown fence marker wherever it appears, then trim
pub fn strip_code_fences(content: &str) -> String {
    fence_marker().replace_all(content, "").trim().to_string()
}

pub fn contains_interactive_input(code: &str) -> bool {
    code.contains(INTERACTIVE_INPUT_CALL)
}
