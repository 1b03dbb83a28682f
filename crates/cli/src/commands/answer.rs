//! Answer command handler.
//!
//! Loads documents, commits them as a corpus, and runs the verified
//! question-answering workflow against it.

use clap::Args;
use docchat_agents::workflow::WorkflowOptions;
use docchat_agents::{AnswerStatus, Query, Workflow, WorkflowOutcome};
use docchat_core::{config::AppConfig, AppError, AppResult};
use docchat_llm::{create_client, create_client_with_fallback, LlmClient};
use docchat_retrieval::{
    ChunkInput, Corpus, CorpusStore, FusionWeights, HybridRetriever, TrigramEmbedder,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answer a question from a set of documents
#[derive(Args, Debug)]
pub struct AnswerCommand {
    /// The question to answer
    pub question: String,

    /// Document files to use as the corpus (plain text)
    #[arg(short, long, required = true, num_args = 1..)]
    pub docs: Vec<PathBuf>,

    /// Corpus identifier
    #[arg(long, default_value = "default")]
    pub corpus: String,

    /// Evidence chunks retrieved per research round
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Output result as JSON
    #[arg(long)]
    pub json: bool,
}

impl AnswerCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing answer command");
        tracing::debug!("Answer command options: {:?}", self);

        // 1. Load and chunk the documents
        let chunks = load_documents(&self.docs)?;
        tracing::info!(
            "Loaded {} chunks from {} document(s)",
            chunks.len(),
            self.docs.len()
        );

        // 2. Commit the corpus
        let store = Arc::new(CorpusStore::new(Arc::new(TrigramEmbedder::default())));
        let corpus = store.commit(&self.corpus, chunks).await?;

        // 3. Wire the model client with provider fallback
        let llm = build_llm_client(config)?;

        // 4. Build the workflow
        let weights = FusionWeights {
            lexical: config.lexical_weight as f64,
            semantic: config.semantic_weight as f64,
        };
        let retriever = Arc::new(HybridRetriever::new(Arc::clone(&store), weights));

        let mut options = WorkflowOptions::from(config);
        if let Some(top_k) = self.top_k {
            options.top_k = top_k as usize;
        }
        let workflow = Workflow::new(llm, retriever, options);

        // 5. Run, cancelling on Ctrl-C
        let cancel = CancellationToken::new();
        let cancel_on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling");
                cancel_on_signal.cancel();
            }
        });

        let query = Query::new(&self.question, &self.corpus);
        let outcome = workflow.answer(query, cancel).await?;

        // 6. Render
        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_outcome(&outcome, &corpus);
        }

        Ok(())
    }
}

/// Read each document and split it into paragraph chunks.
fn load_documents(paths: &[PathBuf]) -> AppResult<Vec<ChunkInput>> {
    let mut chunks = Vec::new();

    for path in paths {
        let text = std::fs::read_to_string(path)?;
        let source = source_name(path);

        for (position, paragraph) in text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .enumerate()
        {
            chunks.push(ChunkInput {
                source: source.clone(),
                position: position as u32,
                text: paragraph.to_string(),
            });
        }
    }

    if chunks.is_empty() {
        return Err(AppError::Config(
            "No text content found in the given documents".to_string(),
        ));
    }

    Ok(chunks)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Create the primary client, with the configured fallback behind it.
fn build_llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let primary = client_for_provider(config, &config.provider, Some(&config.model))?;

    let secondary = match &config.fallback_provider {
        Some(provider) if provider != &config.provider => {
            match client_for_provider(config, provider, None) {
                Ok(client) => Some(client),
                Err(err) => {
                    tracing::warn!("Fallback provider '{}' unavailable: {}", provider, err);
                    None
                }
            }
        }
        _ => None,
    };

    Ok(create_client_with_fallback(primary, secondary))
}

fn client_for_provider(
    config: &AppConfig,
    provider: &str,
    model_override: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_config = config.get_provider_config(provider);

    let model = model_override
        .or_else(|| provider_config.as_ref().map(|pc| pc.model()))
        .unwrap_or(&config.model);

    let endpoint = provider_config.as_ref().and_then(|pc| match pc {
        docchat_core::config::ProviderConfig::Gemini { endpoint, .. } => endpoint.as_deref(),
        docchat_core::config::ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
    });

    let api_key = config.resolve_api_key(provider);

    create_client(provider, model, endpoint, api_key.as_deref())
}

fn print_outcome(outcome: &WorkflowOutcome, corpus: &Corpus) {
    let status = match outcome.status {
        AnswerStatus::Declined => "DECLINED",
        AnswerStatus::Verified => "VERIFIED",
        AnswerStatus::BestEffort => "BEST EFFORT",
    };

    println!("[{}] ({} round(s))", status, outcome.rounds_used);
    println!();
    println!("{}", outcome.answer_text);

    if !outcome.cited_evidence_ids.is_empty() {
        println!();
        println!("Sources:");
        for id in &outcome.cited_evidence_ids {
            if let Some(chunk) = corpus.chunks.iter().find(|c| &c.id == id) {
                println!("  - {} (chunk {})", chunk.source, chunk.position);
            }
        }
    }

    if let Some(feedback) = &outcome.feedback {
        println!();
        println!("Note: {}", feedback);
    }
}
