use conversation_core::mocks::{
    EchoGenerate, FailingGenerate, FailingSynthesize, FixedGenerate, FixedRecognize,
    SilentRecognize, StallingGenerate, TextBytesSynthesize,
};
use conversation_core::{
    PipelineOrchestrator, Role, SessionConfig, SessionStore, TurnError,
};
use std::sync::Arc;
use std::time::Duration;

fn default_store() -> Arc<SessionStore> {
    Arc::new(SessionStore::new(SessionConfig::default()))
}

#[tokio::test]
async fn test_end_to_end_reply() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        FixedGenerate("Sunny".to_string()),
        TextBytesSynthesize,
    );

    let id = pipeline.create_session(None);
    let reply = pipeline
        .handle_user_utterance(&id, "What's the weather?")
        .await
        .unwrap();
    assert_eq!(reply, "Sunny");

    let summary = pipeline.session_summary(&id, 5).unwrap();
    assert!(summary.contains("What's the weather?"));
    assert!(summary.contains("Sunny"));
}

#[tokio::test]
async fn test_generation_failure_then_retry() {
    let store = default_store();
    let broken = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        FailingGenerate,
        TextBytesSynthesize,
    );

    let id = broken.create_session(None);
    let err = broken.handle_user_utterance(&id, "hi").await.unwrap_err();
    assert!(matches!(err, TurnError::Generation(_)));

    // The user turn is recorded, with no phantom assistant turn.
    let history = store.history(&id, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "hi");

    // Same store, working generator: the conversation continues.
    let fixed = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        FixedGenerate("hello again".to_string()),
        TextBytesSynthesize,
    );
    let reply = fixed.handle_user_utterance(&id, "hi").await.unwrap();
    assert_eq!(reply, "hello again");

    let history = store.history(&id, None).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].role, Role::Assistant);
}

#[tokio::test]
async fn test_empty_transcript_is_recorded() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        SilentRecognize,
        EchoGenerate,
        TextBytesSynthesize,
    );

    let id = pipeline.create_session(None);
    let outcome = pipeline
        .handle_utterance(&id, &[0u8; 160], "en-IN")
        .await
        .unwrap();

    assert_eq!(outcome.transcript, "");
    assert_eq!(outcome.reply, "I did not catch that.");

    // The silent turn still occupies its slot in the history.
    let history = store.history(&id, None).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "");
}

#[tokio::test]
async fn test_unknown_session_degrades_to_contextless_turn() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        EchoGenerate,
        TextBytesSynthesize,
    );

    // No session was created: the utterance is dropped, the context is
    // preamble-only, and the turn still produces a reply.
    let reply = pipeline
        .handle_user_utterance("ghost", "hello?")
        .await
        .unwrap();
    assert_eq!(reply, "I did not catch that.");
    assert_eq!(store.active_count(), 0);
    assert!(pipeline.session_summary("ghost", 5).is_none());
}

#[tokio::test]
async fn test_stalled_generation_times_out() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        StallingGenerate,
        TextBytesSynthesize,
    )
    .with_turn_timeout(Duration::from_millis(50));

    let id = pipeline.create_session(None);
    let err = pipeline.handle_user_utterance(&id, "hi").await.unwrap_err();
    assert!(matches!(err, TurnError::Timeout(_)));

    let history = store.history(&id, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[tokio::test]
async fn test_full_audio_turn() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("turn on the lights".to_string()),
        EchoGenerate,
        TextBytesSynthesize,
    );

    let id = pipeline.create_session(None);
    let outcome = pipeline
        .handle_utterance(&id, &[0u8; 320], "en-IN")
        .await
        .unwrap();

    assert_eq!(outcome.transcript, "turn on the lights");
    assert_eq!(outcome.reply, "You said: turn on the lights");
    assert_eq!(outcome.audio, outcome.reply.as_bytes());
}

#[tokio::test]
async fn test_synthesis_failure_keeps_recorded_turns() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("hello".to_string()),
        FixedGenerate("hi there".to_string()),
        FailingSynthesize,
    );

    let id = pipeline.create_session(None);
    let err = pipeline
        .handle_utterance(&id, &[0u8; 320], "en-IN")
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::Synthesis(_)));

    // Generation finished before synthesis failed, so both turns stand.
    let history = store.history(&id, None).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_remember_and_recall_facts() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        FixedGenerate("ok".to_string()),
        TextBytesSynthesize,
    );

    let id = pipeline.create_session(None);
    assert!(pipeline.remember_fact(&id, "favorite_color", "teal"));
    assert_eq!(
        pipeline.recall_fact(&id, "favorite_color").as_deref(),
        Some("teal")
    );
    assert_eq!(pipeline.recall_fact(&id, "favorite_food"), None);

    // Best-effort on unknown sessions: absorbed, not an error.
    assert!(!pipeline.remember_fact("ghost", "k", "v"));
    assert_eq!(pipeline.recall_fact("ghost", "k"), None);
}

#[tokio::test]
async fn test_summary_truncates_long_turns() {
    let store = default_store();
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize("unused".to_string()),
        FixedGenerate("ok".to_string()),
        TextBytesSynthesize,
    );

    let id = pipeline.create_session(None);
    let long = "x".repeat(300);
    pipeline.handle_user_utterance(&id, &long).await.unwrap();

    let summary = pipeline.session_summary(&id, 5).unwrap();
    let user_line = summary.lines().next().unwrap();
    assert!(user_line.starts_with("user: "));
    assert!(user_line.ends_with("..."));
    assert!(user_line.len() < 120);
}
