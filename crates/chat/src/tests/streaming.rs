use super::*;
use crate::store::{MemoryChatStore, SqliteChatStore};
use crate::types::{AskRequest, Role};
use docent_llm::providers::offline::OFFLINE_CHUNKS;
use docent_llm::OfflineClient;

#[tokio::test]
async fn test_stream_forwards_chunks_in_arrival_order() {
    let store = Arc::new(MemoryChatStore::new());
    let chat = controller(Arc::new(OfflineClient::new()), store.clone());
    let mut events: Vec<ChatEvent> = Vec::new();

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut events)
        .await
        .unwrap();

    assert!(matches!(events.first(), Some(ChatEvent::Start { .. })));
    assert_eq!(tokens(&events), OFFLINE_CHUNKS.to_vec());
    match events.last() {
        Some(ChatEvent::Done {
            turn_id,
            incomplete,
            ..
        }) => {
            assert_eq!(turn_id, &outcome.turn_id);
            assert!(!incomplete);
        }
        other => panic!("expected done event, got {:?}", other),
    }

    assert_eq!(outcome.text, OFFLINE_CHUNKS.concat());
    let stored = store.get_turn(&outcome.turn_id).unwrap().unwrap();
    assert_eq!(stored.text.as_deref(), Some(OFFLINE_CHUNKS.concat().as_str()));
    assert!(!stored.incomplete);
}

#[tokio::test]
async fn test_disconnect_after_two_of_five_chunks_persists_partial_answer() {
    let store = Arc::new(MemoryChatStore::new());
    let chat = controller(Arc::new(OfflineClient::new()), store.clone());

    // start + two tokens
    let mut sink = DisconnectingSink::new(3);
    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut sink)
        .await
        .unwrap();

    assert_eq!(tokens(&sink.events), vec!["Working ", "through "]);
    assert!(outcome.incomplete);
    assert!(!outcome.failed);

    let turns = chat.session_turns(&outcome.session_id).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].text.as_deref(), Some("Working through "));
    assert!(turns[1].incomplete);
}

#[tokio::test]
async fn test_disconnect_before_start_still_pairs_the_question() {
    let client = Arc::new(ScriptedClient::new(&["never sent"]));
    let chat = controller(client.clone(), Arc::new(MemoryChatStore::new()));
    let mut sink = DisconnectingSink::new(0);

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut sink)
        .await
        .unwrap();

    assert!(outcome.incomplete);
    assert!(client.prompts().is_empty());
    assert_eq!(chat.session_turns(&outcome.session_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_turn_visible_alone_while_generating() {
    struct ProbeSink {
        store: Arc<MemoryChatStore>,
        turns_at_start: Option<usize>,
    }

    #[async_trait]
    impl EventSink for ProbeSink {
        async fn emit(&mut self, event: ChatEvent) -> AppResult<()> {
            if let ChatEvent::Start { session_id, .. } = event {
                self.turns_at_start = Some(self.store.list_turns(&session_id)?.len());
            }
            Ok(())
        }
    }

    let store = Arc::new(MemoryChatStore::new());
    let chat = controller(Arc::new(OfflineClient::new()), store.clone());
    let mut sink = ProbeSink {
        store: store.clone(),
        turns_at_start: None,
    };

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.turns_at_start, Some(1));
    assert_eq!(chat.session_turns(&outcome.session_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_text_and_appends_error() {
    let client = Arc::new(
        ScriptedClient::new(&["Purge the pump ", "[Source 1]."]).failing_after("connection reset"),
    );
    let chat = controller(client, Arc::new(MemoryChatStore::new()));
    let mut events: Vec<ChatEvent> = Vec::new();

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut events)
        .await
        .unwrap();

    assert!(outcome.failed);
    assert!(outcome.text.starts_with("Purge the pump [Source 1]."));
    assert!(outcome
        .text
        .ends_with("[Generation error: LLM error: connection reset]"));
    assert_eq!(outcome.citations.len(), 1);
    assert_eq!(outcome.citations[0].document_id, "doc-sop");

    // The error note is streamed too, so the caller sees the stored text
    assert_eq!(tokens(&events).concat(), outcome.text);
    assert!(matches!(events.last(), Some(ChatEvent::Done { .. })));
}

#[tokio::test]
async fn test_stalled_stream_times_out() {
    let client = Arc::new(ScriptedClient::new(&["Partial "]).stalling());
    let chat = controller(client, Arc::new(MemoryChatStore::new()));
    let mut events: Vec<ChatEvent> = Vec::new();

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut events)
        .await
        .unwrap();

    assert!(outcome.failed);
    assert!(outcome.text.starts_with("Partial "));
    assert!(outcome.text.contains("timed out"));
    assert!(!outcome.incomplete);
}

#[tokio::test]
async fn test_empty_stream_is_upstream_error() {
    let client = Arc::new(ScriptedClient::new(&[]));
    let chat = controller(client, Arc::new(MemoryChatStore::new()));
    let mut events: Vec<ChatEvent> = Vec::new();

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "startup"), &mut events)
        .await
        .unwrap();

    assert!(outcome.failed);
    assert!(outcome.text.starts_with("[Generation error:"));
}

#[tokio::test]
async fn test_done_event_carries_persisted_citations() {
    let client = Arc::new(ScriptedClient::new(&[
        "Use [Source 2] ",
        "then [Source 1] ",
        "and again [Source 2].",
    ]));
    let store = Arc::new(SqliteChatStore::open_in_memory().unwrap());
    let chat = controller(client, store);
    let (mut tx, mut rx) = tokio::sync::mpsc::channel::<ChatEvent>(16);

    let outcome = chat
        .ask_stream(AskRequest::new(SCOPE, "calibration startup"), &mut tx)
        .await
        .unwrap();
    drop(tx);

    let mut events: Vec<ChatEvent> = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let ids: Vec<&str> = outcome
        .citations
        .iter()
        .map(|c| c.document_id.as_str())
        .collect();
    assert_eq!(ids, vec!["doc-cal", "doc-sop"]);

    match events.last() {
        Some(ChatEvent::Done { citations, .. }) => assert_eq!(citations, &outcome.citations),
        other => panic!("expected done event, got {:?}", other),
    }
    assert_eq!(
        chat.citations_for_turn(&outcome.turn_id).unwrap(),
        outcome.citations
    );
}
