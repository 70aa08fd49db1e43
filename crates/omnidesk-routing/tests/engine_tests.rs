// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing engine integration tests over a temp SQLite store.

use std::sync::Arc;
use std::time::Duration;

use omnidesk_core::{ChannelType, ConversationState, MessageKind, OmnideskError, StorageAdapter};
use omnidesk_routing::{
    ChannelDispatcher, DispatchOutcome, IngestOutcome, Presence, RoutingEngine, RoutingSettings,
    SessionHandle,
};
use omnidesk_test_utils::{MockChannel, TestDesk};

const WA: ChannelType = ChannelType::WhatsApp;
const SETTLE: Duration = Duration::from_secs(5);

/// Moves the paused clock and lets woken recheck tasks run.
async fn advance(by: Duration) {
    tokio::time::advance(by).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Lets the recheck scheduled by a login fire before the test proceeds.
async fn settle() {
    advance(SETTLE + Duration::from_millis(1)).await;
}

fn queued_id(outcome: IngestOutcome) -> String {
    match outcome {
        IngestOutcome::Queued { conversation_id } => conversation_id,
        other => panic!("expected a queued conversation, got {other:?}"),
    }
}

#[tokio::test]
async fn first_whatsapp_message_queues_one_conversation() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;

    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);

    let conversation = desk.engine.conversation(&id).await.unwrap();
    assert_eq!(conversation.state, ConversationState::Queued);
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].kind, MessageKind::Event);
    assert_eq!(conversation.messages[1].body, "Hello");
    assert_eq!(desk.engine.queue_ids().await, vec![id.clone()]);

    let channel = desk.channel(WA);
    assert_eq!(channel.auto_reply_count().await, 1);
    let sent = channel.sent_messages().await;
    assert_eq!(sent[0].external_id, "061111222");
    assert_eq!(sent[0].text, RoutingSettings::default().auto_reply);

    let events = ana.drain();
    assert!(events.iter().any(|e| e["event"] == "event_conversation_started"));
    let offers: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "event_new_conversation")
        .collect();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["conversationId"], id.as_str());

    // Persisted alongside the live copy.
    let stored = desk.storage.messages_for_conversation(&id).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn follow_up_messages_append_without_second_auto_reply() {
    let desk = TestDesk::builder().build().await.unwrap();
    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);

    let outcome = desk.customer_says(WA, "061111222", "Anyone?").await;
    assert_eq!(
        outcome,
        IngestOutcome::Appended {
            conversation_id: id.clone()
        }
    );
    assert_eq!(desk.engine.conversation(&id).await.unwrap().messages.len(), 3);
    assert_eq!(desk.engine.queue_ids().await.len(), 1);
    assert_eq!(desk.channel(WA).auto_reply_count().await, 1);
}

#[tokio::test]
async fn exactly_one_concurrent_accept_wins() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;
    let (mut marko, _) = desk.login("102").await;
    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);

    let (a, b) = tokio::join!(desk.engine.accept("101", &id), desk.engine.accept("102", &id));
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(OmnideskError::Rejected(_))));

    let conversation = desk.engine.conversation(&id).await.unwrap();
    assert_eq!(conversation.state, ConversationState::Assigned);
    assert!(desk.engine.queue_ids().await.is_empty());

    for client in [&mut ana, &mut marko] {
        let accepted = client.drain_named("event_conversation_accepted");
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0]["conversationId"], id.as_str());
        assert_eq!(accepted[0]["agent"], conversation.agent.as_deref().unwrap());
    }
}

#[tokio::test]
async fn accept_of_non_head_is_rejected() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.login("101").await;
    let first = queued_id(desk.customer_says(WA, "061111222", "one").await);
    let second = queued_id(desk.customer_says(WA, "061333444", "two").await);

    let err = desk.engine.accept("101", &second).await.unwrap_err();
    assert!(matches!(err, OmnideskError::Rejected(_)));
    assert_eq!(desk.engine.queue_ids().await, vec![first, second]);
}

#[tokio::test]
async fn accept_offers_the_new_head_to_idle_agents() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;
    let (mut marko, _) = desk.login("102").await;
    let first = queued_id(desk.customer_says(WA, "061111222", "one").await);
    let second = queued_id(desk.customer_says(WA, "061333444", "two").await);
    ana.drain();
    marko.drain();

    desk.engine.accept("101", &first).await.unwrap();

    let offers = marko.drain_named("event_new_conversation");
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["conversationId"], second.as_str());
    // Ana still has a free slot, so she is offered the new head too.
    assert_eq!(ana.drain_named("event_new_conversation").len(), 1);
}

#[tokio::test]
async fn agent_at_capacity_cannot_accept() {
    let desk = TestDesk::builder()
        .with_agents(&[("101", 1)])
        .build()
        .await
        .unwrap();
    desk.login("101").await;
    let first = queued_id(desk.customer_says(WA, "061111222", "one").await);
    let second = queued_id(desk.customer_says(WA, "061333444", "two").await);

    desk.engine.accept("101", &first).await.unwrap();
    let err = desk.engine.accept("101", &second).await.unwrap_err();
    assert!(matches!(err, OmnideskError::Rejected(_)));
    assert_eq!(desk.engine.queue_ids().await, vec![second]);
}

#[tokio::test(start_paused = true)]
async fn finishing_frees_capacity_and_offers_after_settle_delay() {
    let desk = TestDesk::builder()
        .with_agents(&[("101", 1)])
        .with_settle_delay(SETTLE)
        .build()
        .await
        .unwrap();
    let (mut ana, _) = desk.login("101").await;
    settle().await;
    let first = queued_id(desk.customer_says(WA, "061111222", "one").await);
    desk.engine.accept("101", &first).await.unwrap();
    let second = queued_id(desk.customer_says(WA, "061333444", "two").await);
    ana.drain();

    desk.engine.finish("101", &first).await.unwrap();
    assert_eq!(ana.drain_named("event_conversation_finished").len(), 1);
    assert!(ana.drain_named("event_new_conversation").is_empty());

    advance(SETTLE - Duration::from_millis(1)).await;
    assert!(ana.drain_named("event_new_conversation").is_empty());

    advance(Duration::from_millis(2)).await;
    let offers = ana.drain_named("event_new_conversation");
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["conversationId"], second.as_str());
}

#[tokio::test(start_paused = true)]
async fn finishing_one_of_two_offers_the_head_after_settle_delay() {
    let desk = TestDesk::builder()
        .with_agents(&[("101", 2)])
        .with_settle_delay(SETTLE)
        .build()
        .await
        .unwrap();
    let (mut ana, _) = desk.login("101").await;
    settle().await;
    let first = queued_id(desk.customer_says(WA, "061111222", "one").await);
    desk.engine.accept("101", &first).await.unwrap();
    let second = queued_id(desk.customer_says(WA, "061333444", "two").await);
    desk.engine.accept("101", &second).await.unwrap();
    assert_eq!(desk.engine.agent_status("101").await.unwrap().active, 2);
    let third = queued_id(desk.customer_says(WA, "061555666", "three").await);
    ana.drain();

    desk.engine.finish("101", &first).await.unwrap();
    assert_eq!(desk.engine.agent_status("101").await.unwrap().active, 1);
    assert!(ana.drain_named("event_new_conversation").is_empty());

    advance(SETTLE - Duration::from_millis(1)).await;
    assert!(ana.drain_named("event_new_conversation").is_empty());

    advance(Duration::from_millis(2)).await;
    let offers = ana.drain_named("event_new_conversation");
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["conversationId"], third.as_str());
    assert_eq!(desk.engine.queue_ids().await, vec![third]);
}

#[tokio::test(start_paused = true)]
async fn pausing_before_the_recheck_withdraws_the_offer() {
    let desk = TestDesk::builder()
        .with_agents(&[("101", 1)])
        .with_settle_delay(SETTLE)
        .build()
        .await
        .unwrap();
    let (mut ana, _) = desk.login("101").await;
    settle().await;
    let first = queued_id(desk.customer_says(WA, "061111222", "one").await);
    desk.engine.accept("101", &first).await.unwrap();
    desk.customer_says(WA, "061333444", "two").await;

    desk.engine.finish("101", &first).await.unwrap();
    desk.engine.pause("101", true).await.unwrap();
    ana.drain();

    advance(SETTLE * 2).await;
    assert!(ana.drain_named("event_new_conversation").is_empty());
    assert!(desk.engine.agent_status("101").await.unwrap().paused);
}

#[tokio::test(start_paused = true)]
async fn rejecting_an_offer_re_offers_after_settle_delay() {
    let desk = TestDesk::builder()
        .with_settle_delay(SETTLE)
        .build()
        .await
        .unwrap();
    let (mut ana, _) = desk.login("101").await;
    settle().await;

    let id = queued_id(desk.customer_says(WA, "061111222", "hello").await);
    assert_eq!(ana.drain_named("event_new_conversation").len(), 1);

    desk.engine.reject("101", &id).await.unwrap();
    assert!(ana.drain_named("event_new_conversation").is_empty());

    advance(SETTLE - Duration::from_millis(1)).await;
    assert!(ana.drain_named("event_new_conversation").is_empty());

    advance(Duration::from_millis(2)).await;
    let offers = ana.drain_named("event_new_conversation");
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["conversationId"], id.as_str());
    assert_eq!(desk.engine.queue_ids().await, vec![id]);

    assert!(desk.engine.reject("999", "x").await.is_err());
}

#[tokio::test]
async fn paused_agents_see_new_conversations_without_an_offer() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;
    let (mut marko, _) = desk.login("102").await;
    desk.engine.pause("101", true).await.unwrap();
    ana.drain();
    marko.drain();

    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);

    let events = ana.drain();
    assert!(events.iter().any(|e| {
        e["event"] == "event_conversation_started" && e["conversation"]["id"] == id.as_str()
    }));
    assert!(!events.iter().any(|e| e["event"] == "event_new_conversation"));
    assert_eq!(marko.drain_named("event_new_conversation").len(), 1);
}

#[tokio::test]
async fn completed_call_for_unknown_extension_is_still_recorded() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.engine
        .call_completed("999", "061222333", "1700000000.1", 0, 42)
        .await
        .unwrap();

    let contact = desk
        .storage
        .find_contact_by_identity(ChannelType::PhoneCall, "061222333")
        .await
        .unwrap()
        .unwrap();
    let calls = desk.storage.calls_for_contact(&contact.id).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "1700000000.1");
    assert_eq!(calls[0].agent, "999");
    assert_eq!(calls[0].duration, 42);
}

#[tokio::test]
async fn completed_calls_without_unique_id_are_kept_apart() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.login("101").await;
    desk.engine
        .call_completed("101", "061222333", "", 0, 10)
        .await
        .unwrap();
    desk.engine
        .call_completed("101", "061222333", "", 0, 20)
        .await
        .unwrap();

    let contact = desk
        .storage
        .find_contact_by_identity(ChannelType::PhoneCall, "061222333")
        .await
        .unwrap()
        .unwrap();
    let calls = desk.storage.calls_for_contact(&contact.id).await.unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| !c.id.is_empty()));
    assert_ne!(calls[0].id, calls[1].id);
}

#[tokio::test]
async fn finish_requires_the_assigned_agent() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.login("101").await;
    desk.login("102").await;
    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);
    desk.engine.accept("101", &id).await.unwrap();

    assert!(desk.engine.finish("102", &id).await.is_err());
    assert!(desk.engine.finish("101", "missing").await.is_err());
    desk.engine.finish("101", &id).await.unwrap();
    assert!(desk.engine.conversation(&id).await.is_none());
    assert_eq!(desk.engine.agent_status("101").await.unwrap().active, 0);
}

#[tokio::test]
async fn new_message_after_finish_starts_a_fresh_conversation() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.login("101").await;
    let first = queued_id(desk.customer_says(WA, "061111222", "Hello").await);
    desk.engine.accept("101", &first).await.unwrap();
    desk.engine.finish("101", &first).await.unwrap();

    let second = queued_id(desk.customer_says(WA, "061111222", "Me again").await);
    assert_ne!(first, second);
    assert_eq!(desk.engine.queue_ids().await, vec![second.clone()]);

    // Finished conversations stay readable from history.
    let history = desk.engine.messages(&first).await.unwrap();
    assert_eq!(history.last().unwrap().body, "event_conversation_finished");

    let contact_id = desk.engine.conversation(&second).await.unwrap().customer.id;
    let customer = desk.engine.customer_history(&contact_id).await.unwrap();
    assert_eq!(customer.conversations.len(), 2);
    assert_eq!(desk.channel(WA).auto_reply_count().await, 2);
}

#[tokio::test]
async fn customer_messages_are_relayed_to_the_assigned_agent() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;
    let (mut marko, _) = desk.login("102").await;
    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);
    desk.engine.accept("101", &id).await.unwrap();
    ana.drain();
    marko.drain();

    desk.customer_says(WA, "061111222", "Are you there?").await;

    let relayed = ana.drain_named("event_new_message");
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0]["message"]["body"], "Are you there?");
    assert!(marko.drain_named("event_new_message").is_empty());
}

#[tokio::test]
async fn repeated_delivery_receipt_is_a_no_op() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;
    let id = queued_id(desk.customer_says(WA, "061111222", "Hello").await);
    desk.engine.accept("101", &id).await.unwrap();
    desk.engine.send_message("101", &id, "How can I help?").await.unwrap();
    ana.drain();

    let outcome = desk.customer_receipt(WA, "061111222", "delivered").await;
    assert_eq!(
        outcome,
        IngestOutcome::StatusRaised {
            conversation_id: id.clone(),
            changed: 1
        }
    );
    assert_eq!(ana.drain_named("event_message_status_updated").len(), 1);

    let repeat = desk.customer_receipt(WA, "061111222", "delivered").await;
    assert_eq!(repeat, IngestOutcome::Ignored);
    assert!(ana.drain_named("event_message_status_updated").is_empty());

    // Statuses never go backwards.
    let seen = desk.customer_receipt(WA, "061111222", "seen").await;
    assert!(matches!(seen, IngestOutcome::StatusRaised { changed: 1, .. }));
    let stale = desk.customer_receipt(WA, "061111222", "delivered").await;
    assert_eq!(stale, IngestOutcome::Ignored);
}

#[tokio::test]
async fn agent_replies_are_delivered_through_the_channel() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.login("101").await;
    let id = queued_id(desk.customer_says(ChannelType::Viber, "viber-u1", "Hi").await);
    desk.engine.accept("101", &id).await.unwrap();

    let message = desk.engine.send_message("101", &id, "Hello!").await.unwrap();
    assert!(message.from_agent);

    let sent = desk.channel(ChannelType::Viber).sent_messages().await;
    let reply = sent.iter().find(|m| !m.auto_reply).unwrap();
    assert_eq!(reply.external_id, "viber-u1");
    assert_eq!(reply.text, "Hello!");

    assert!(desk.engine.send_message("102", &id, "not mine").await.is_err());
}

#[tokio::test]
async fn login_rejects_bad_secret_and_returns_snapshot() {
    let desk = TestDesk::builder().build().await.unwrap();
    let queued = queued_id(desk.customer_says(WA, "061111222", "Hello").await);

    let (session, _rx) = SessionHandle::channel(99);
    let err = desk.engine.login("101", "wrong", session).await.unwrap_err();
    assert!(matches!(err, OmnideskError::Authentication(_)));

    let (_ana, snapshot) = desk.login("101").await;
    assert_eq!(snapshot.agent.extension, "101");
    assert_eq!(snapshot.agents.len(), 2);
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.queue[0].id, queued);
    assert!(snapshot.conversations.is_empty());
}

#[tokio::test]
async fn disconnect_only_logs_off_the_owning_connection() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (ana, _) = desk.login("101").await;

    desk.engine.disconnect("101", ana.connection + 1000).await;
    assert_eq!(
        desk.engine.agent_status("101").await.unwrap().presence,
        Presence::LoggedIn
    );

    desk.engine.disconnect("101", ana.connection).await;
    assert_eq!(
        desk.engine.agent_status("101").await.unwrap().presence,
        Presence::LoggedOut
    );
}

#[tokio::test]
async fn a_second_login_takes_over_the_session() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (first, _) = desk.login("101").await;
    assert!(desk.engine.owns_session("101", first.connection).await);

    let (second, _) = desk.login("101").await;
    assert!(!desk.engine.owns_session("101", first.connection).await);
    assert!(desk.engine.owns_session("101", second.connection).await);
    assert!(!desk.engine.owns_session("999", second.connection).await);
}

#[tokio::test]
async fn logged_out_agents_get_no_pushes() {
    let desk = TestDesk::builder().build().await.unwrap();
    let (mut ana, _) = desk.login("101").await;
    desk.engine.logoff("101").await.unwrap();
    ana.drain();

    desk.customer_says(WA, "061111222", "Hello").await;
    assert!(ana.drain().is_empty());
    assert!(desk.engine.logoff("101").await.is_err());
}

#[tokio::test]
async fn updating_a_number_merges_duplicate_contacts() {
    let desk = TestDesk::builder().build().await.unwrap();
    let wa = queued_id(desk.customer_says(WA, "061111222", "from whatsapp").await);
    let viber = queued_id(desk.customer_says(ChannelType::Viber, "viber-u1", "from viber").await);
    let wa_contact = desk.engine.conversation(&wa).await.unwrap().customer;
    let viber_contact = desk.engine.conversation(&viber).await.unwrap().customer;
    assert_ne!(wa_contact.id, viber_contact.id);

    let updated = desk
        .engine
        .update_contact(&viber_contact.id, "Ana Anic", "061111222")
        .await
        .unwrap();
    assert_eq!(updated.name, "Ana Anic");
    assert_eq!(updated.number, "061111222");

    let history = desk.engine.customer_history(&viber_contact.id).await.unwrap();
    assert_eq!(history.conversations.len(), 2);
    assert!(desk.engine.customer_history(&wa_contact.id).await.is_err());

    // Live conversations now point at the surviving contact.
    let live = desk.engine.conversation(&wa).await.unwrap();
    assert_eq!(live.customer.id, viber_contact.id);
}

#[tokio::test]
async fn restore_rebuilds_queue_and_assignments() {
    let desk = TestDesk::builder().build().await.unwrap();
    desk.login("101").await;
    let assigned = queued_id(desk.customer_says(WA, "061111222", "one").await);
    desk.engine.accept("101", &assigned).await.unwrap();
    let waiting = queued_id(desk.customer_says(WA, "061333444", "two").await);

    let restored = RoutingEngine::new(
        RoutingSettings::default(),
        Arc::clone(&desk.storage),
        Vec::new(),
    );
    let summary = restored.restore().await.unwrap();
    assert_eq!(summary.agents, 2);
    assert_eq!(summary.queued, 1);
    assert_eq!(summary.assigned, 1);
    assert_eq!(restored.queue_ids().await, vec![waiting]);

    let (session, _rx) = SessionHandle::channel(1);
    let snapshot = restored.login("101", "secret-101", session).await.unwrap();
    assert_eq!(snapshot.conversations.len(), 1);
    assert_eq!(snapshot.conversations[0].id, assigned);
    assert_eq!(restored.agent_status("101").await.unwrap().active, 1);
}

#[tokio::test]
async fn dispatcher_routes_by_path_prefix() {
    let desk = TestDesk::builder().build().await.unwrap();
    let dispatcher = ChannelDispatcher::new(desk.engine.clone());

    assert_eq!(
        dispatcher.dispatch("/telegram", b"{}").await,
        DispatchOutcome::UnknownChannel
    );
    assert_eq!(
        dispatcher.dispatch("/viber", b"not json").await,
        DispatchOutcome::Malformed
    );
    assert_eq!(
        dispatcher.dispatch("/viber", br#"{"from":"u1"}"#).await,
        DispatchOutcome::Ignored
    );

    let body = MockChannel::message_body("061111222", "Ana", "Hello");
    let outcome = dispatcher.dispatch("/whatsapp", &body).await;
    assert!(matches!(
        outcome,
        DispatchOutcome::Ingested(IngestOutcome::Queued { .. })
    ));
    assert_eq!(desk.engine.queue_ids().await.len(), 1);
}
