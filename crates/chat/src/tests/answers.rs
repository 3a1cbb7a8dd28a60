use super::*;
use crate::access::ScopeAllowList;
use crate::store::MemoryChatStore;
use crate::types::{AskRequest, Role};
use docent_knowledge::{LINKED_CITATION_SCORE, RETRIEVAL_CITATION_SCORE};
use docent_llm::UnavailableClient;

fn memory_store() -> Arc<MemoryChatStore> {
    Arc::new(MemoryChatStore::new())
}

#[tokio::test]
async fn test_answer_links_cited_sources_in_rank_order() {
    let client = Arc::new(
        ScriptedClient::new(&[]).with_completion("Purge first [Source 1]. See also [Source 9]."),
    );
    let store = memory_store();
    let chat = controller(client.clone(), store.clone());

    let outcome = chat
        .ask(AskRequest::new(SCOPE, "calibration startup"))
        .await
        .unwrap();

    assert!(!outcome.failed);
    assert_eq!(outcome.text, "Purge first [Source 1]. See also [Source 9].");
    assert_eq!(outcome.citations.len(), 1);
    assert_eq!(outcome.citations[0].document_id, "doc-sop");
    assert_eq!(outcome.citations[0].score, LINKED_CITATION_SCORE);

    let prompt = &client.prompts()[0];
    let sop = prompt.find("[Source 1] - Startup SOP (sop)").unwrap();
    let cal = prompt
        .find("[Source 2] - Daily Calibration Protocol (protocol)")
        .unwrap();
    assert!(sop < cal);
    assert!(!prompt.contains("Random Notes"));
    assert!(!prompt.contains("Old startup calibration sheet"));

    let turns = chat.session_turns(&outcome.session_id).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text.as_deref(), Some("calibration startup"));
    assert_eq!(turns[1].id, outcome.turn_id);
    assert_eq!(chat.citations_for_turn(&outcome.turn_id).unwrap(), outcome.citations);
}

#[tokio::test]
async fn test_unmatched_question_uses_ungrounded_prompt() {
    let client = Arc::new(ScriptedClient::new(&[]).with_completion("General guidance."));
    let chat = controller(client.clone(), memory_store());

    let outcome = chat.ask(AskRequest::new(SCOPE, "why is the sky blue")).await.unwrap();

    assert!(outcome.citations.is_empty());
    let prompt = &client.prompts()[0];
    assert!(!prompt.contains("[Source"));
    assert!(prompt.contains("- Vendor: Agilent"));
}

#[tokio::test]
async fn test_missing_provider_becomes_error_answer() {
    let client = Arc::new(UnavailableClient::new(
        "openai",
        "OpenAI provider requires an API key (set DOCENT_API_KEY)",
    ));
    let store = memory_store();
    let chat = controller(client, store.clone());

    let outcome = chat
        .ask(AskRequest::new(SCOPE, "calibration startup"))
        .await
        .unwrap();

    assert!(outcome.failed);
    assert!(outcome.text.starts_with("[Generation error: Configuration error:"));
    assert!(outcome.text.contains("DOCENT_API_KEY"));
    assert!(outcome.citations.is_empty());

    let turns = chat.session_turns(&outcome.session_id).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].text.as_deref(), Some(outcome.text.as_str()));
}

#[tokio::test]
async fn test_empty_completion_is_upstream_error() {
    let client = Arc::new(ScriptedClient::new(&[]).with_completion("   "));
    let chat = controller(client, memory_store());

    let outcome = chat.ask(AskRequest::new(SCOPE, "startup")).await.unwrap();
    assert!(outcome.failed);
    assert!(outcome.text.contains("empty completion"));
}

#[tokio::test]
async fn test_completion_timeout_becomes_error_answer() {
    let client = Arc::new(ScriptedClient::new(&[]).stalling());
    let chat = controller(client, memory_store());

    let outcome = chat.ask(AskRequest::new(SCOPE, "startup")).await.unwrap();
    assert!(outcome.failed);
    assert!(outcome.text.contains("timed out"));
    assert_eq!(chat.session_turns(&outcome.session_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_fallback_citations_when_enabled() {
    let client = Arc::new(ScriptedClient::new(&[]).with_completion("No markers here."));
    let chat = controller(client, memory_store()).with_options(ControllerOptions {
        fallback_citations: 2,
        ..test_options()
    });

    let outcome = chat
        .ask(AskRequest::new(SCOPE, "calibration startup"))
        .await
        .unwrap();

    let ids: Vec<&str> = outcome
        .citations
        .iter()
        .map(|c| c.document_id.as_str())
        .collect();
    assert_eq!(ids, vec!["doc-sop", "doc-cal"]);
    assert!(outcome
        .citations
        .iter()
        .all(|c| c.score == RETRIEVAL_CITATION_SCORE));
}

#[tokio::test]
async fn test_fallback_skipped_for_failed_answers() {
    let client = Arc::new(ScriptedClient::new(&[]).failing_completions("boom"));
    let chat = controller(client, memory_store()).with_options(ControllerOptions {
        fallback_citations: 2,
        ..test_options()
    });

    let outcome = chat.ask(AskRequest::new(SCOPE, "startup")).await.unwrap();
    assert!(outcome.failed);
    assert!(outcome.citations.is_empty());
}

#[tokio::test]
async fn test_follow_up_questions_share_a_session() {
    let client = Arc::new(ScriptedClient::new(&[]).with_completion("Answer [Source 1]"));
    let chat = controller(client, memory_store());

    let first = chat.ask(AskRequest::new(SCOPE, "startup")).await.unwrap();
    let second = chat
        .ask(AskRequest::new(SCOPE, "calibration").in_session(&first.session_id))
        .await
        .unwrap();
    assert_eq!(first.session_id, second.session_id);

    let roles: Vec<Role> = chat
        .session_turns(&first.session_id)
        .unwrap()
        .iter()
        .map(|t| t.role)
        .collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    let wrong_scope = chat
        .ask(AskRequest::new("nmr", "startup").in_session(&first.session_id))
        .await;
    assert!(matches!(wrong_scope, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_invalid_requests_create_nothing() {
    let store = memory_store();
    let chat = controller(Arc::new(ScriptedClient::new(&["x"])), store.clone());

    let empty = chat.ask(AskRequest::new(SCOPE, "   ")).await;
    assert!(matches!(empty, Err(AppError::InvalidInput(_))));

    let unknown = chat
        .ask(AskRequest::new(SCOPE, "startup").in_session("missing"))
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_access_policy_checked_before_turn_creation() {
    let store = memory_store();
    let chat = controller(Arc::new(ScriptedClient::new(&["x"])), store.clone())
        .with_access_policy(Arc::new(ScopeAllowList::new().grant("ana", SCOPE)));

    let denied = chat
        .ask(AskRequest::new(SCOPE, "startup").with_owner("bo"))
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let allowed = chat
        .ask(AskRequest::new(SCOPE, "startup").with_owner("ana"))
        .await
        .unwrap();
    let session = store.get_session(&allowed.session_id).unwrap().unwrap();
    assert_eq!(session.owner.as_deref(), Some("ana"));
    assert_eq!(session.title, "startup");
}
