//! End-to-end workflow scenarios over scripted model replies.
//!
//! Each test commits a small in-memory corpus, scripts the model calls in
//! order, and drives the full orchestrator through [`Workflow::answer`].

mod workflow_scenarios;

use crate::workflow::{Workflow, WorkflowOptions};
use docchat_llm::LlmClient;
use docchat_retrieval::{ChunkInput, CorpusStore, FusionWeights, HybridRetriever, TrigramEmbedder};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_CORPUS: &str = "solar-manual";

/// The well-formed verification report the verifier accepts as-is.
pub const CLEAN_REPORT: &str = "Supported: YES\n\
     Unsupported Claims: []\n\
     Contradictions: []\n\
     Relevant: YES\n\
     Additional Details: None";

fn manual_chunks() -> Vec<ChunkInput> {
    vec![
        ChunkInput {
            source: "manual.txt".to_string(),
            position: 1,
            text: "Solar panels convert sunlight into electricity using photovoltaic cells."
                .to_string(),
        },
        ChunkInput {
            source: "manual.txt".to_string(),
            position: 2,
            text: "The battery stores excess energy generated during daylight hours."
                .to_string(),
        },
        ChunkInput {
            source: "manual.txt".to_string(),
            position: 3,
            text: "Regular cleaning of the panels improves energy output significantly."
                .to_string(),
        },
    ]
}

/// Build a workflow over the solar manual corpus and the given client.
pub async fn build_workflow(llm: Arc<dyn LlmClient>, options: WorkflowOptions) -> Workflow {
    let store = Arc::new(CorpusStore::new(Arc::new(TrigramEmbedder::default())));
    store
        .commit(TEST_CORPUS, manual_chunks())
        .await
        .expect("corpus commit failed");

    let retriever = Arc::new(HybridRetriever::new(store, FusionWeights::default()));
    Workflow::new(llm, retriever, options)
}

pub fn test_options(max_rounds: u32) -> WorkflowOptions {
    WorkflowOptions {
        max_rounds,
        top_k: 3,
        stage_timeout: Duration::from_secs(5),
        max_concurrent_queries: 4,
    }
}
