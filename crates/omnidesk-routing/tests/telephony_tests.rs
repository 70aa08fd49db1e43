// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony bridge tests against a scripted manager connector.

use std::sync::Arc;
use std::time::Duration;

use omnidesk_core::{OmnideskError, StorageAdapter, TelephonyConnector};
use omnidesk_routing::TelephonyBridge;
use omnidesk_test_utils::{AgentClient, MockConnector, TestDesk};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const RECONNECT: Duration = Duration::from_millis(20);

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

async fn next_named(client: &mut AgentClient, event: &str) -> Value {
    for _ in 0..100 {
        if let Some(found) = client.drain_named(event).into_iter().next() {
            return found;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{event} never arrived");
}

fn bridge(desk: &TestDesk, connector: &Arc<MockConnector>) -> TelephonyBridge {
    TelephonyBridge::new(
        desk.engine.clone(),
        Arc::clone(connector) as Arc<dyn TelephonyConnector>,
        RECONNECT,
    )
}

#[tokio::test]
async fn startup_connect_failure_is_returned() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    connector
        .push_failure(OmnideskError::TelephonyLogin("Authentication failed".into()))
        .await;

    let err = bridge(&desk, &connector)
        .start(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OmnideskError::TelephonyLogin(_)));
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn login_and_pause_drive_pbx_queue_membership() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    let control = connector.push_session().await;
    let cancel = CancellationToken::new();
    let handle = bridge(&desk, &connector).start(cancel.clone()).await.unwrap();

    desk.login("101").await;
    desk.engine.pause("101", true).await.unwrap();
    desk.engine.logoff("101").await.unwrap();

    let recorded = control.actions.recorded().await;
    let names: Vec<_> = recorded.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["QueueAdd", "QueuePause", "QueueRemove"]);
    let (_, params) = &recorded[0];
    assert!(params.contains(&("Queue".to_string(), "SalesQueue".to_string())));
    assert!(params.contains(&("Interface".to_string(), "PJSIP/101".to_string())));
    assert!(recorded[1].1.contains(&("Paused".to_string(), "true".to_string())));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn refused_queue_add_fails_login() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    let control = connector.push_session().await;
    control.actions.refuse("QueueAdd").await;
    let cancel = CancellationToken::new();
    let handle = bridge(&desk, &connector).start(cancel.clone()).await.unwrap();

    let (session, _rx) = omnidesk_routing::SessionHandle::channel(7);
    let err = desk
        .engine
        .login("101", "secret-101", session)
        .await
        .unwrap_err();
    assert!(matches!(err, OmnideskError::Rejected(_)));
    assert_eq!(
        desk.engine.agent_status("101").await.unwrap().presence,
        omnidesk_routing::Presence::LoggedOut
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn call_lifecycle_events_update_agent_and_history() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    let control = connector.push_session().await;
    let cancel = CancellationToken::new();
    let handle = bridge(&desk, &connector).start(cancel.clone()).await.unwrap();
    let (mut ana, _) = desk.login("101").await;

    control
        .emit(
            "AgentCalled",
            &[
                ("Interface", "PJSIP/101"),
                ("CallerIDNum", "061222333"),
                ("Uniqueid", "1700000000.42"),
            ],
        )
        .await;
    let offer = next_named(&mut ana, "event_new_conversation").await;
    assert_eq!(offer["type"], "phone_call");
    assert_eq!(offer["callId"], "1700000000.42");
    assert_eq!(offer["callType"], 1);
    assert_eq!(offer["customer"]["number"], "061222333");
    let contact_id = offer["customer"]["id"].as_str().unwrap().to_string();
    // Calls bypass the waiting queue.
    assert!(desk.engine.queue_ids().await.is_empty());

    control
        .emit(
            "AgentConnect",
            &[("Interface", "PJSIP/101"), ("CallerIDNum", "061222333")],
        )
        .await;
    let accepted = next_named(&mut ana, "event_conversation_accepted").await;
    assert_eq!(accepted["agent"], "101");
    assert!(desk.engine.agent_status("101").await.unwrap().on_call);

    control
        .emit(
            "AgentComplete",
            &[
                ("Interface", "PJSIP/101"),
                ("CallerIDNum", "061222333"),
                ("Uniqueid", "1700000000.42"),
                ("Timestamp", "1700000100.000"),
                ("TalkTime", "42"),
            ],
        )
        .await;

    let storage = Arc::clone(&desk.storage);
    let contact = contact_id.clone();
    eventually(|| {
        let storage = Arc::clone(&storage);
        let contact = contact.clone();
        async move { !storage.calls_for_contact(&contact).await.unwrap().is_empty() }
    })
    .await;
    assert!(!desk.engine.agent_status("101").await.unwrap().on_call);

    let calls = desk.storage.calls_for_contact(&contact_id).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "1700000000.42");
    assert_eq!(calls[0].agent, "101");
    assert_eq!(calls[0].duration, 42);
    assert_eq!(calls[0].timestamp, 1_700_000_100_000);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn unknown_events_and_agents_are_ignored() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    let control = connector.push_session().await;
    let cancel = CancellationToken::new();
    let handle = bridge(&desk, &connector).start(cancel.clone()).await.unwrap();
    let (mut ana, _) = desk.login("101").await;

    control.emit("PeerStatus", &[("Peer", "PJSIP/101")]).await;
    control
        .emit(
            "AgentConnect",
            &[("Interface", "PJSIP/999"), ("CallerIDNum", "061222333")],
        )
        .await;
    control
        .emit(
            "AgentConnect",
            &[("Interface", "PJSIP/101"), ("CallerIDNum", "061222333")],
        )
        .await;

    // The bridge survives both and still applies the last event.
    next_named(&mut ana, "event_conversation_accepted").await;

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn transport_loss_reconnects_until_a_session_is_up() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    let first = connector.push_session().await;
    connector
        .push_failure(OmnideskError::telephony("connection refused"))
        .await;
    let second = connector.push_session().await;
    let cancel = CancellationToken::new();
    let handle = bridge(&desk, &connector).start(cancel.clone()).await.unwrap();

    first.fail("connection reset by peer").await;

    let watched = Arc::clone(&connector);
    eventually(|| {
        let watched = Arc::clone(&watched);
        async move { watched.attempts() == 3 }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    desk.login("101").await;
    assert!(first.actions.recorded().await.is_empty());
    assert_eq!(second.actions.names().await, vec!["QueueAdd"]);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn without_a_session_queue_membership_is_skipped() {
    let desk = TestDesk::builder().build().await.unwrap();
    let connector = Arc::new(MockConnector::new());
    let first = connector.push_session().await;
    let cancel = CancellationToken::new();
    let handle = bridge(&desk, &connector).start(cancel.clone()).await.unwrap();

    first.fail("broken pipe").await;
    let watched = Arc::clone(&connector);
    eventually(|| {
        let watched = Arc::clone(&watched);
        async move { watched.attempts() >= 2 }
    })
    .await;

    // Reconnects keep failing; login still works without the PBX.
    desk.login("101").await;
    assert!(first.actions.recorded().await.is_empty());

    cancel.cancel();
    handle.await.unwrap();
}
