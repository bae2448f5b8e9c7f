/// Item Pipeline - One Question, End to End
///
/// generate → execute → BatchItem. The generated string is handed to the
/// executor whatever it is; the executor's precondition is the only guard
/// against running error text. Panics in either stage are caught here.

use crate::error::SolveError;
use crate::executor::Executor;
use crate::generation::CodeGenerator;
use autosolve_common::types::{BatchItem, ExecutionResult, GenerationResult};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, instrument};

#[derive(Clone)]
pub struct ItemPipeline {
    generator: Arc<dyn CodeGenerator>,
    executor: Executor,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl ItemPipeline {
    pub fn new(generator: Arc<dyn CodeGenerator>, executor: Executor) -> Self {
        Self { generator, executor }
    }

    #[instrument(skip_all, fields(question_index = index))]
    pub async fn solve(&self, index: usize, question: &str) -> BatchItem {
        let generation = match AssertUnwindSafe(self.generator.generate(question))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "Generation stage panicked");
                GenerationResult::failure(format!("generation stage panicked: {}", message))
            }
        };

        let execution = match AssertUnwindSafe(self.executor.execute(generation.as_text()))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "Execution stage panicked");
                ExecutionResult::Failure(
                    SolveError::ExecutionFault(format!("execution stage panicked: {}", message)).to_string(),
                )
            }
        };

        BatchItem::new(index, question, generation, execution)
    }
}
