mod helpers;

use std::sync::Arc;

use helpers::{test_brain, FakeAi};
use synapse::brain::analysis;
use synapse::brain::notes::NewNote;

async fn note(brain: &synapse::service::Brain, user: &str) -> String {
    brain
        .create_note(
            user,
            NewNote {
                title: "Event sourcing".into(),
                body: "Store every change as an immutable event.".into(),
                tags: vec!["architecture".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .note
        .id
}

#[tokio::test]
async fn analysis_stores_summary_concepts_and_merges_tags() {
    let ai = Arc::new(FakeAi {
        summary: Some("Changes are kept as an append-only log.".into()),
        concepts: Some(r#"{"key_concepts": ["event log", "replay"], "tags": ["CQRS", "architecture"]}"#.into()),
        ..Default::default()
    });
    let (brain, user, _) = test_brain(ai.clone());
    let id = note(&brain, &user).await;

    let outcome = brain.analyze_note(&user, &id).await.unwrap();
    assert!(!outcome.degraded);
    assert_eq!(ai.generate_count(), 2);
    assert_eq!(
        outcome.note.summary.as_deref(),
        Some("Changes are kept as an append-only log.")
    );
    assert_eq!(outcome.note.tags, vec!["architecture", "cqrs"]);

    let stored = outcome.analysis.unwrap();
    assert_eq!(stored.key_concepts, vec!["event log", "replay"]);
    assert_eq!(stored.model, "fake-model");

    let (uid, nid) = (user.clone(), id.clone());
    let fetched = brain
        .with_db(move |conn| analysis::get_analysis(conn, &uid, &nid))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.id, stored.id);
}

#[tokio::test]
async fn ai_failure_degrades_to_empty_analysis() {
    let ai = Arc::new(FakeAi::default());
    let (brain, user, _) = test_brain(ai);
    let id = note(&brain, &user).await;

    let outcome = brain.analyze_note(&user, &id).await.unwrap();
    assert!(outcome.degraded);
    assert!(outcome.analysis.is_none());
    assert!(outcome.note.summary.is_none());
    assert_eq!(outcome.note.tags, vec!["architecture"]);
}

#[tokio::test]
async fn partial_failure_keeps_what_succeeded() {
    let ai = Arc::new(FakeAi {
        summary: Some("A short summary.".into()),
        ..Default::default()
    });
    let (brain, user, _) = test_brain(ai);
    let id = note(&brain, &user).await;

    let outcome = brain.analyze_note(&user, &id).await.unwrap();
    assert!(outcome.degraded);
    let stored = outcome.analysis.unwrap();
    assert_eq!(stored.summary, "A short summary.");
    assert!(stored.key_concepts.is_empty());
    assert_eq!(outcome.note.summary.as_deref(), Some("A short summary."));
}

#[tokio::test]
async fn analyzing_missing_note_is_not_found() {
    let ai = Arc::new(FakeAi::default());
    let (brain, user, _) = test_brain(ai.clone());

    let err = brain.analyze_note(&user, "no-such-note").await.unwrap_err();
    assert!(matches!(err, synapse::error::Error::NotFound { .. }));
    assert_eq!(ai.generate_count(), 0);
}
