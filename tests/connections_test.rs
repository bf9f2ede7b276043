mod helpers;

use std::sync::Arc;

use helpers::{test_brain, FakeAi};
use synapse::brain::connections::{self, Direction, NewConnection};
use synapse::brain::notes::NewNote;
use synapse::brain::types::ConnectionOrigin;
use synapse::error::Error;
use synapse::service::Brain;

async fn note(brain: &Brain, user: &str, title: &str) -> String {
    brain
        .create_note(
            user,
            NewNote {
                title: title.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .note
        .id
}

#[tokio::test]
async fn suggestions_are_stored_as_ai_connections() {
    let ai = Arc::new(FakeAi {
        link_candidates: Some("Builds On"),
        ..Default::default()
    });
    let (brain, user, _) = test_brain(ai.clone());
    let source = note(&brain, &user, "Tokio runtime").await;
    let target = note(&brain, &user, "Async executors").await;

    let stored = brain.suggest_connections(&user, &source).await.unwrap();
    assert_eq!(stored.len(), 1, "ids outside the candidate list are dropped");
    assert_eq!(stored[0].source_id, source);
    assert_eq!(stored[0].target_id, target);
    assert_eq!(stored[0].relationship, "builds_on");
    assert_eq!(stored[0].origin, ConnectionOrigin::Ai);
    assert_eq!(ai.generate_count(), 1);

    let (uid, tid) = (user.clone(), target.clone());
    let linked = brain
        .with_db(move |conn| connections::list_for_note(conn, &uid, &tid))
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].direction, Direction::Incoming);
    assert_eq!(linked[0].other_note_id, source);
}

#[tokio::test]
async fn repeated_suggestions_do_not_duplicate() {
    let ai = Arc::new(FakeAi {
        link_candidates: Some("related"),
        ..Default::default()
    });
    let (brain, user, _) = test_brain(ai);
    let source = note(&brain, &user, "One").await;
    note(&brain, &user, "Two").await;

    let first = brain.suggest_connections(&user, &source).await.unwrap();
    let second = brain.suggest_connections(&user, &source).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, second[0].id);

    let (uid, nid) = (user.clone(), source.clone());
    let linked = brain
        .with_db(move |conn| connections::list_for_note(conn, &uid, &nid))
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
}

#[tokio::test]
async fn generation_failure_yields_no_connections() {
    let ai = Arc::new(FakeAi::default());
    let (brain, user, _) = test_brain(ai.clone());
    let source = note(&brain, &user, "First").await;
    note(&brain, &user, "Second").await;

    let stored = brain.suggest_connections(&user, &source).await.unwrap();
    assert!(stored.is_empty());
    assert_eq!(ai.generate_count(), 1);
}

#[tokio::test]
async fn missing_embedding_and_failing_ai_yields_no_connections() {
    let ai = Arc::new(FakeAi {
        fail_embed: true,
        connections: Some("[]".into()),
        ..Default::default()
    });
    let (brain, user, _) = test_brain(ai.clone());
    let source = note(&brain, &user, "Lonely").await;

    let stored = brain.suggest_connections(&user, &source).await.unwrap();
    assert!(stored.is_empty());
    assert_eq!(ai.generate_count(), 0);
}

#[tokio::test]
async fn manual_connections_deduplicate_and_reject_self_links() {
    let (brain, user, _) = test_brain(Arc::new(FakeAi::default()));
    let a = note(&brain, &user, "A").await;
    let b = note(&brain, &user, "B").await;

    let (uid, src, dst) = (user.clone(), a.clone(), b.clone());
    let (first, second, self_link) = brain
        .with_db(move |conn| {
            let input = NewConnection {
                target_id: dst.clone(),
                relationship: "related".into(),
                strength: 0.5,
                reason: None,
            };
            let first = connections::create_connection(conn, &uid, &src, &input, ConnectionOrigin::Manual)?;
            let second = connections::create_connection(conn, &uid, &src, &input, ConnectionOrigin::Manual)?;
            let self_link = connections::create_connection(
                conn,
                &uid,
                &src,
                &NewConnection {
                    target_id: src.clone(),
                    ..input
                },
                ConnectionOrigin::Manual,
            );
            Ok((first, second, self_link))
        })
        .await
        .unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(first.connection.id, second.connection.id);
    assert!(matches!(self_link, Err(Error::Validation(_))));
}
