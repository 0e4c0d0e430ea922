use anyhow::Result;
use async_trait::async_trait;

use crate::pipeline::Pipeline;
use crate::types::Label;

#[async_trait]
pub trait Engine {
    /// One label per text, in input order.
    async fn predict(&self, texts: Vec<String>) -> Result<Vec<Label>>;
}

/// Serves predictions from a pipeline loaded once at startup. The pipeline
/// is never mutated, so shared access needs no locking.
pub struct PipelineEngine {
    pipeline: Pipeline,
}

impl PipelineEngine {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Engine for PipelineEngine {
    #[tracing::instrument(skip(self, texts), fields(input_count = texts.len()))]
    async fn predict(&self, texts: Vec<String>) -> Result<Vec<Label>> {
        let labels = self.pipeline.predict(&texts)?;
        tracing::debug!(?labels, "Inference finished");
        Ok(labels)
    }
}
