/// Batch Runner - Sequential, Order-Preserving
///
/// Items are solved one at a time in input order. One item's failure is
/// recorded on that item only; the output always has one BatchItem per
/// question, in the same order.

use crate::executor::Executor;
use crate::generation::GenerationClient;
use crate::pipeline::ItemPipeline;
use anyhow::Result;
use autosolve_common::config::SolverConfig;
use autosolve_common::types::{BatchItem, ItemStatus};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct BatchRunner {
    pipeline: ItemPipeline,
}

impl BatchRunner {
    pub fn new(pipeline: ItemPipeline) -> Self {
        Self { pipeline }
    }

    /// Wire the HTTP generation client and the configured sandbox together
    pub fn from_config(config: &SolverConfig) -> Result<Self> {
        let generator = GenerationClient::new(config.generation.clone())?;
        let executor = Executor::from_config(&config.sandbox)?;

        info!(
            model = %config.generation.model,
            sandbox = executor.engine_name(),
            max_attempts = config.generation.max_attempts,
            "Batch runner ready"
        );

        Ok(Self::new(ItemPipeline::new(Arc::new(generator), executor)))
    }

    pub async fn run<S: AsRef<str>>(&self, questions: &[S]) -> Vec<BatchItem> {
        let total = questions.len();
        let batch_start = Instant::now();
        info!(questions = total, "Starting batch");

        let mut items = Vec::with_capacity(total);
        for (index, question) in questions.iter().enumerate() {
            let item_start = Instant::now();
            let item = self.pipeline.solve(index, question.as_ref()).await;
            let elapsed_ms = item_start.elapsed().as_millis() as u64;

            if item.status == ItemStatus::Solved {
                info!(question = index + 1, of = total, elapsed_ms, "Question solved");
            } else {
                warn!(
                    question = index + 1,
                    of = total,
                    status = %item.status,
                    elapsed_ms,
                    "Question not solved"
                );
            }
            items.push(item);
        }

        let solved = items.iter().filter(|i| i.status == ItemStatus::Solved).count();
        info!(
            questions = total,
            solved,
            failed = total - solved,
            elapsed_ms = batch_start.elapsed().as_millis() as u64,
            "Batch complete"
        );

        items
    }
}
