pub mod batch;
pub mod docker;
pub mod engine;
pub mod error;
pub mod executor;
pub mod generation;
pub mod pipeline;
pub mod process;
pub mod prompt;

#[cfg(test)]
mod testing;

pub use batch::BatchRunner;
pub use engine::{RawRun, SandboxEngine};
pub use error::SolveError;
pub use executor::Executor;
pub use generation::{CodeGenerator, GenerationClient};
pub use pipeline::ItemPipeline;
