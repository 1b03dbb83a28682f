use super::{build_workflow, test_options, CLEAN_REPORT, TEST_CORPUS};
use crate::state::{AnswerStatus, Query};
use docchat_core::AppError;
use docchat_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ScriptedClient};
use docchat_core::AppResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const REJECTING_REPORT: &str = "Supported: NO\n\
     Unsupported Claims: [the charge time figure]\n\
     Contradictions: []\n\
     Relevant: YES\n\
     Additional Details: None";

fn solar_query() -> Query {
    Query::new("How do solar panels convert sunlight?", TEST_CORPUS)
}

#[tokio::test]
async fn test_verified_answer_in_one_round() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("CAN_ANSWER");
    client.push_reply("Solar panels convert sunlight into electricity via photovoltaic cells.");
    client.push_reply(CLEAN_REPORT);

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(solar_query(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::Verified);
    assert_eq!(outcome.rounds_used, 1);
    assert!(outcome.answer_text.contains("photovoltaic"));
    assert!(!outcome.cited_evidence_ids.is_empty());
    assert!(outcome.feedback.is_none());
    // relevance + research + verify
    assert_eq!(client.call_count(), 3);
}

#[tokio::test]
async fn test_irrelevant_query_declines_without_research() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("NO_MATCH");

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(
            Query::new("What is the capital of France panels?", TEST_CORPUS),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::Declined);
    assert_eq!(outcome.rounds_used, 0);
    assert!(outcome.cited_evidence_ids.is_empty());
    // Only the relevance classification ran; no draft was ever synthesized
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_no_evidence_degrades_to_best_effort() {
    // Query tokens that appear nowhere in the corpus: both indexes come
    // back empty, the gate defers to research, and the draft carries zero
    // citations, which the verifier rejects without a model call.
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("I cannot find this in the documents.");

    let workflow = build_workflow(client.clone(), test_options(1)).await;
    let outcome = workflow
        .answer(Query::new("zz qq xx", TEST_CORPUS), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::BestEffort);
    assert_eq!(outcome.rounds_used, 1);
    assert!(outcome.cited_evidence_ids.is_empty());
    assert!(outcome
        .feedback
        .as_deref()
        .unwrap()
        .contains("cites no supporting evidence"));
    // One research call; neither the gate nor the verifier consulted the model
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_rejected_draft_is_reresearched_with_feedback() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("CAN_ANSWER");
    client.push_reply("The battery charges in two hours.");
    client.push_reply(REJECTING_REPORT);
    client.push_reply("The battery stores excess energy generated during daylight hours.");
    client.push_reply(CLEAN_REPORT);

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(
            Query::new("How does the battery store energy?", TEST_CORPUS),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::Verified);
    assert_eq!(outcome.rounds_used, 2);
    assert!(outcome.feedback.is_none());
    assert_eq!(client.call_count(), 5);

    // The second research prompt carries the reviewer feedback
    let prompts = client.recorded_prompts();
    assert!(prompts[3].contains("Reviewer feedback"));
    assert!(prompts[3].contains("the charge time figure"));
    // The first research prompt does not
    assert!(!prompts[1].contains("Reviewer feedback"));
}

#[tokio::test]
async fn test_exhausted_budget_is_best_effort_never_verified() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("CAN_ANSWER");
    client.push_reply("First draft.");
    client.push_reply(REJECTING_REPORT);
    client.push_reply("Second draft.");
    client.push_reply(REJECTING_REPORT);

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(solar_query(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::BestEffort);
    assert_eq!(outcome.rounds_used, 2);
    assert_eq!(outcome.answer_text, "Second draft.");
    assert!(outcome
        .feedback
        .as_deref()
        .unwrap()
        .contains("the charge time figure"));
}

#[tokio::test]
async fn test_unknown_corpus_declines() {
    let client = Arc::new(ScriptedClient::new());

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(
            Query::new("How do solar panels work?", "no-such-corpus"),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::Declined);
    assert!(outcome
        .feedback
        .as_deref()
        .unwrap()
        .contains("no-such-corpus"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_report_retried_once() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("CAN_ANSWER");
    client.push_reply("Solar panels convert sunlight into electricity.");
    client.push_reply("I think the answer looks good to me!");
    // The retry replays the whole verify stage, which is one model call
    client.push_reply(CLEAN_REPORT);

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(solar_query(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::Verified);
    assert_eq!(outcome.rounds_used, 1);
    assert_eq!(client.call_count(), 4);
}

#[tokio::test]
async fn test_provider_failure_degrades_to_best_effort() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("CAN_ANSWER");
    client.push_failure("rate limited");

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let outcome = workflow
        .answer(solar_query(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, AnswerStatus::BestEffort);
    assert_eq!(outcome.answer_text, "I cannot answer this question.");
    assert!(outcome.feedback.as_deref().unwrap().contains("rate limited"));
    // Provider errors are not transient; the research stage was not retried
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let client = Arc::new(ScriptedClient::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let workflow = build_workflow(client.clone(), test_options(2)).await;
    let err = workflow.answer(solar_query(), cancel).await.unwrap_err();

    assert!(matches!(err, AppError::Cancelled));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_identical_script_reproduces_identical_outcome() {
    let client = Arc::new(ScriptedClient::new());
    let workflow = build_workflow(client.clone(), test_options(2)).await;

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        client.push_reply("CAN_ANSWER");
        client.push_reply("Solar panels convert sunlight into electricity.");
        client.push_reply(CLEAN_REPORT);

        let outcome = workflow
            .answer(solar_query(), CancellationToken::new())
            .await
            .unwrap();
        outcomes.push(outcome);
    }

    assert_eq!(outcomes[0].status, outcomes[1].status);
    assert_eq!(outcomes[0].answer_text, outcomes[1].answer_text);
    assert_eq!(outcomes[0].cited_evidence_ids, outcomes[1].cited_evidence_ids);
    assert_eq!(outcomes[0].rounds_used, outcomes[1].rounds_used);
}

/// Client that answers every call with a clean report after a short delay,
/// tracking the peak number of in-flight completions.
struct GaugeClient {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeClient {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GaugeClient {
    fn provider_name(&self) -> &str {
        "gauge"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(LlmResponse {
            content: CLEAN_REPORT.to_string(),
            model: "gauge".to_string(),
            usage: LlmUsage::default(),
        })
    }
}

#[tokio::test]
async fn test_semaphore_bounds_concurrent_queries() {
    let client = Arc::new(GaugeClient::new());
    let mut options = test_options(1);
    options.max_concurrent_queries = 2;

    let workflow = Arc::new(build_workflow(client.clone(), options).await);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let workflow = Arc::clone(&workflow);
            tokio::spawn(async move {
                workflow.answer(solar_query(), CancellationToken::new()).await
            })
        })
        .collect();

    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.status, AnswerStatus::Verified);
    }

    assert!(client.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(start_paused = true)]
async fn test_stage_timeout_surfaces_in_feedback() {
    struct StuckClient;

    #[async_trait::async_trait]
    impl LlmClient for StuckClient {
        fn provider_name(&self) -> &str {
            "stuck"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AppError::Llm("unreachable".to_string()))
        }
    }

    let workflow = build_workflow(Arc::new(StuckClient), test_options(1)).await;
    let outcome = workflow
        .answer(solar_query(), CancellationToken::new())
        .await
        .unwrap();

    // The relevance stage timed out twice (attempt + retry) before any
    // draft existed, so the degraded answer is the fallback text
    assert_eq!(outcome.status, AnswerStatus::BestEffort);
    assert_eq!(outcome.rounds_used, 0);
    assert!(outcome.feedback.as_deref().unwrap().contains("timed out"));
}
