// Integration tests for the interview session lifecycle
//
// Grace-window tests run on a paused clock so timers fire deterministically.
// Tests that finalize an interview touch the filesystem and run in real time.

mod common;

use common::{drain_client, FlakyEvaluator, Harness};
use interview_relay::evaluation::Evaluator;
use interview_relay::relay::{ClientEvent, ConnectionHandle, DeciderEvent};
use interview_relay::session::{AttachOutcome, SessionState, Speaker, TranscriptEntry};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_exchange_is_recorded_in_order() {
    let mut h = Harness::new(None);
    let handle = ConnectionHandle::new();
    let mut client = h.relay.register(handle);

    let outcome = h.registry.attach("p1", handle, "Ada").await;
    assert_eq!(outcome, AttachOutcome::Created);

    h.registry
        .relay_inbound("p1", handle, "hello".to_string())
        .await;
    h.registry
        .relay_outbound("p1", "hi".to_string(), Some("intro".to_string()), None)
        .await;

    assert_eq!(
        h.decider_events(),
        vec![
            DeciderEvent::StartSession {
                participant_id: "p1".to_string(),
                display_name: "Ada".to_string(),
            },
            DeciderEvent::InboundMessage {
                participant_id: "p1".to_string(),
                content: "hello".to_string(),
            },
        ]
    );
    assert_eq!(
        drain_client(&mut client),
        vec![ClientEvent::Content {
            content: "hi".to_string()
        }]
    );

    // A second connection resyncs from the full transcript
    let second = ConnectionHandle::new();
    let mut second_client = h.relay.register(second);
    assert_eq!(
        h.registry.attach("p1", second, "Ada").await,
        AttachOutcome::Refreshed
    );

    let events = drain_client(&mut second_client);
    assert_eq!(events.len(), 1);
    match &events[0] {
        ClientEvent::History { transcript } => {
            assert_eq!(
                transcript,
                &vec![
                    TranscriptEntry::participant("hello"),
                    TranscriptEntry::interviewer("hi", Some("intro".to_string())),
                ]
            );
            assert_eq!(transcript[0].speaker, Speaker::Participant);
        }
        other => panic!("expected history, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_interviewer_turn_is_still_recorded() {
    let h = Harness::new(None);
    let handle = ConnectionHandle::new();
    let mut client = h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;

    h.registry
        .relay_outbound("p1", String::new(), Some("intro".to_string()), None)
        .await;

    assert_eq!(
        drain_client(&mut client),
        vec![ClientEvent::Content {
            content: String::new()
        }]
    );
    let snapshot = h.registry.snapshot("p1").await.unwrap();
    assert_eq!(snapshot.transcript_len, 1);
}

#[tokio::test]
async fn test_empty_end_turn_keeps_its_phase() {
    let h = Harness::new(None);
    let handle = ConnectionHandle::new();
    h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;

    h.registry
        .relay_outbound("p1", String::new(), Some("end".to_string()), None)
        .await;
    h.registry.wait_finalizing().await;

    let stored = h.store.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].record.transcript,
        vec![TranscriptEntry::interviewer("", Some("end".to_string()))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_resumes_session() {
    let mut h = Harness::new(None);
    let first = ConnectionHandle::new();
    h.relay.register(first);
    h.registry.attach("p1", first, "Ada").await;
    h.registry.relay_inbound("p1", first, "hello".to_string()).await;

    h.registry.disconnect("p1", first).await;
    let snapshot = h.registry.snapshot("p1").await.unwrap();
    assert_eq!(snapshot.state, SessionState::Grace);
    assert!(!snapshot.connected);
    assert_eq!(h.media.is_paused("p1"), Some(true));

    tokio::time::sleep(Duration::from_secs(10)).await;

    let second = ConnectionHandle::new();
    let mut client = h.relay.register(second);
    assert_eq!(
        h.registry.attach("p1", second, "Ada").await,
        AttachOutcome::Resumed
    );
    assert_eq!(h.media.is_paused("p1"), Some(false));
    assert!(matches!(
        drain_client(&mut client).as_slice(),
        [ClientEvent::History { transcript }] if transcript.len() == 1
    ));

    // Only the original start was announced
    let starts = h
        .decider_events()
        .into_iter()
        .filter(|e| matches!(e, DeciderEvent::StartSession { .. }))
        .count();
    assert_eq!(starts, 1);

    // The cancelled timer never fires
    tokio::time::sleep(Duration::from_secs(120)).await;
    let snapshot = h.registry.snapshot("p1").await.unwrap();
    assert_eq!(snapshot.state, SessionState::Active);
    assert!(h.decider_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_discards_session() {
    let mut h = Harness::new(None);
    let first = ConnectionHandle::new();
    h.relay.register(first);
    h.registry.attach("p1", first, "Ada").await;
    assert!(h.media.ingest("p1", vec![1, 2, 3]));
    h.media.drain_once();

    h.registry.disconnect("p1", first).await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(!h.registry.contains("p1"));
    assert!(!h.media.is_active("p1"));
    assert_eq!(h.store.len().await, 0);
    assert_eq!(
        h.decider_events(),
        vec![
            DeciderEvent::StartSession {
                participant_id: "p1".to_string(),
                display_name: "Ada".to_string(),
            },
            DeciderEvent::EndSession {
                participant_id: "p1".to_string(),
            },
        ]
    );

    // Coming back afterwards starts over
    let second = ConnectionHandle::new();
    h.relay.register(second);
    assert_eq!(
        h.registry.attach("p1", second, "Ada").await,
        AttachOutcome::Created
    );
    assert!(matches!(
        h.decider_events().as_slice(),
        [DeciderEvent::StartSession { .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_time_excludes_grace_window() {
    let h = Harness::new(None);
    let first = ConnectionHandle::new();
    h.relay.register(first);
    h.registry.attach("p1", first, "Ada").await;

    tokio::time::sleep(Duration::from_secs(3)).await;
    h.registry.disconnect("p1", first).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let second = ConnectionHandle::new();
    h.relay.register(second);
    h.registry.attach("p1", second, "Ada").await;
    tokio::time::sleep(Duration::from_secs(4)).await;

    let snapshot = h.registry.snapshot("p1").await.unwrap();
    assert_eq!(snapshot.elapsed_ms, 7000);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_disconnects_keep_only_latest_timer() {
    let h = Harness::new(None);

    let first = ConnectionHandle::new();
    h.relay.register(first);
    h.registry.attach("p1", first, "Ada").await;
    h.registry.disconnect("p1", first).await;

    tokio::time::sleep(Duration::from_secs(50)).await;
    let second = ConnectionHandle::new();
    h.relay.register(second);
    h.registry.attach("p1", second, "Ada").await;
    h.registry.disconnect("p1", second).await;

    // First timer's deadline passes without effect
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(h.registry.contains("p1"));

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(!h.registry.contains("p1"));
}

#[tokio::test]
async fn test_stale_disconnect_is_ignored() {
    let h = Harness::new(None);
    let old = ConnectionHandle::new();
    let new = ConnectionHandle::new();
    h.relay.register(old);
    h.relay.register(new);

    h.registry.attach("p1", old, "Ada").await;
    h.registry.attach("p1", new, "Ada").await;
    h.registry.disconnect("p1", old).await;

    let snapshot = h.registry.snapshot("p1").await.unwrap();
    assert_eq!(snapshot.state, SessionState::Active);
    assert!(snapshot.connected);

    // Messages from the replaced connection are dropped too
    h.registry.relay_inbound("p1", old, "ghost".to_string()).await;
    assert_eq!(h.registry.snapshot("p1").await.unwrap().transcript_len, 0);
}

#[tokio::test]
async fn test_unknown_participant_operations_are_noops() {
    let mut h = Harness::new(None);

    h.registry
        .relay_outbound("ghost", "hi".to_string(), None, None)
        .await;
    h.registry
        .relay_inbound("ghost", ConnectionHandle::new(), "hello".to_string())
        .await;
    h.registry.disconnect("ghost", ConnectionHandle::new()).await;
    h.registry.end_explicit("ghost").await;
    h.registry.end_on_error("ghost", "boom".to_string()).await;
    assert!(h.registry.finalize("ghost", json!({})).await.is_none());

    assert_eq!(h.registry.active_count(), 0);
    assert!(h.decider_events().is_empty());
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn test_end_phase_persists_despite_evaluation_failure() {
    let evaluator = Arc::new(FlakyEvaluator::default());
    let dyn_evaluator: Arc<dyn Evaluator> = evaluator.clone();
    let h = Harness::new(Some(dyn_evaluator));

    let handle = ConnectionHandle::new();
    let mut client = h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;
    assert!(h.media.ingest("p1", b"frame-1".to_vec()));
    h.media.drain_once();
    // Still queued when the interview ends, and must not be lost
    assert!(h.media.ingest("p1", b"frame-2".to_vec()));

    h.registry.relay_inbound("p1", handle, "hello".to_string()).await;
    h.registry
        .relay_outbound(
            "p1",
            "Thanks, that's all.".to_string(),
            Some("end".to_string()),
            Some(json!({"summary": "good"})),
        )
        .await;

    assert_eq!(
        drain_client(&mut client),
        vec![ClientEvent::Content {
            content: "Thanks, that's all.".to_string()
        }]
    );

    assert_eq!(h.registry.finalizing_count(), 1);
    h.registry.wait_finalizing().await;
    assert_eq!(h.registry.finalizing_count(), 0);
    assert!(!h.registry.contains("p1"));

    let stored = h.store.all().await;
    assert_eq!(stored.len(), 1);
    let stored = &stored[0];
    assert_eq!(stored.record.participant_id, "p1");
    assert_eq!(stored.record.transcript.len(), 2);
    assert_eq!(stored.record.evaluation, json!({"summary": "good"}));
    assert!(stored.enrichment.scores.is_none());
    assert_eq!(stored.enrichment.emotion, Some(json!({"dominant": "calm"})));

    let media = stored.record.media_locator.clone().expect("media saved");
    assert_eq!(std::fs::read(&media).unwrap(), b"frame-1frame-2".to_vec());

    assert_eq!(
        evaluator.calls(),
        vec![
            "extract_features:p1".to_string(),
            "extract_emotion:1".to_string()
        ]
    );
}

#[tokio::test]
async fn test_finalize_while_disconnected() {
    let h = Harness::new(None);
    let handle = ConnectionHandle::new();
    h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;
    h.registry.relay_inbound("p1", handle, "hello".to_string()).await;
    h.registry.disconnect("p1", handle).await;

    let id = h
        .registry
        .finalize("p1", json!({"summary": "short"}))
        .await
        .expect("record saved");

    assert!(!h.registry.contains("p1"));
    let stored = h.store.get(&id).await.unwrap();
    assert!(stored.record.media_locator.is_none());
    assert_eq!(stored.record.transcript, vec![TranscriptEntry::participant("hello")]);
}

#[tokio::test]
async fn test_end_on_error_notifies_and_persists_nothing() {
    let mut h = Harness::new(None);
    let handle = ConnectionHandle::new();
    let mut client = h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;
    h.decider_events();

    h.registry
        .end_on_error("p1", "model crashed".to_string())
        .await;

    assert_eq!(
        drain_client(&mut client),
        vec![ClientEvent::Fault {
            reason: "model crashed".to_string()
        }]
    );
    assert!(!h.registry.contains("p1"));
    assert!(!h.media.is_active("p1"));
    assert_eq!(h.store.len().await, 0);
    assert!(h.decider_events().is_empty());
}

#[tokio::test]
async fn test_end_explicit_notifies_decider() {
    let mut h = Harness::new(None);
    let handle = ConnectionHandle::new();
    h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;
    h.decider_events();

    h.registry.end_explicit("p1").await;

    assert_eq!(
        h.decider_events(),
        vec![DeciderEvent::EndSession {
            participant_id: "p1".to_string()
        }]
    );
    assert!(!h.registry.contains("p1"));
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn test_participants_are_independent() {
    let h = Harness::new(None);
    let a = ConnectionHandle::new();
    let b = ConnectionHandle::new();
    h.relay.register(a);
    h.relay.register(b);

    h.registry.attach("alice", a, "Alice").await;
    h.registry.attach("bob", b, "Bob").await;
    h.registry.end_explicit("alice").await;

    assert!(!h.registry.contains("alice"));
    assert!(h.registry.contains("bob"));
    assert_eq!(h.registry.active_count(), 1);
}

#[tokio::test]
async fn test_media_sent_before_disconnect_survives_reconnect() {
    let h = Harness::new(None);
    let first = ConnectionHandle::new();
    h.relay.register(first);
    h.registry.attach("p1", first, "Ada").await;

    assert!(h.media.ingest("p1", vec![7; 10]));
    h.registry.disconnect("p1", first).await;
    // The drain tick lands while the session is in its grace window
    h.media.drain_once();

    let second = ConnectionHandle::new();
    h.relay.register(second);
    h.registry.attach("p1", second, "Ada").await;

    assert_eq!(h.media.buffered_bytes("p1"), Some(10));
}

#[tokio::test]
async fn test_active_count_ignores_unknown_participants() {
    let h = Harness::new(None);
    let handle = ConnectionHandle::new();
    h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;

    // Lookups for absent participants must not be counted, even while running
    let registry = h.registry.clone();
    let lookups = tokio::spawn(async move {
        for _ in 0..50 {
            registry
                .relay_outbound("ghost", "hi".to_string(), None, None)
                .await;
            tokio::task::yield_now().await;
        }
    });
    for _ in 0..50 {
        assert_eq!(h.registry.active_count(), 1);
        tokio::task::yield_now().await;
    }
    lookups.await.unwrap();

    h.registry.end_explicit("p1").await;
    assert_eq!(h.registry.active_count(), 0);
}
