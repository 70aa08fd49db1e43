// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events pushed to agent connections outside of any request/response.

use omnidesk_core::{ChannelType, Contact, Conversation, Message, MessageStatus};
use serde::{Deserialize, Serialize};

/// Phone calls are offered with `callType = 1`.
pub const CALL_TYPE_INBOUND: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum PushEvent {
    /// Offer of a conversation the agent may accept. Queue offers carry the
    /// head conversation; phone offers carry the PBX call id.
    #[serde(rename = "event_new_conversation")]
    NewConversation {
        conversation_id: String,
        #[serde(rename = "type")]
        channel: ChannelType,
        customer: Contact,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        messages: Vec<Message>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_type: Option<u8>,
    },

    /// A new conversation entered the waiting queue. Sent to every
    /// logged-in agent, busy and paused ones included, so each queue view
    /// stays current; it is not an offer. Only idle agents also receive
    /// [`PushEvent::NewConversation`] for the head.
    #[serde(rename = "event_conversation_started")]
    ConversationStarted { conversation: Conversation },

    /// A conversation (or call) was taken by `agent`.
    #[serde(rename = "event_conversation_accepted")]
    ConversationAccepted {
        conversation_id: String,
        agent: String,
    },

    #[serde(rename = "event_conversation_finished")]
    ConversationFinished { conversation_id: String },

    /// Customer message on a conversation assigned to the receiving agent.
    #[serde(rename = "event_new_message")]
    NewMessage {
        conversation_id: String,
        message: Message,
    },

    /// Delivery receipts raised the status of the agent's messages.
    #[serde(rename = "event_message_status_updated")]
    MessageStatusUpdated {
        conversation_id: String,
        status: MessageStatus,
    },
}

impl PushEvent {
    /// Queue offer for a live conversation.
    pub fn offer(conversation: &Conversation) -> Self {
        Self::NewConversation {
            conversation_id: conversation.id.clone(),
            channel: conversation.channel,
            customer: conversation.customer.clone(),
            messages: conversation.messages.clone(),
            call_id: None,
            call_type: None,
        }
    }

    /// Targeted offer of a ringing phone call.
    pub fn call_offer(conversation_id: String, customer: Contact, call_id: String) -> Self {
        Self::NewConversation {
            conversation_id,
            channel: ChannelType::PhoneCall,
            customer,
            messages: Vec::new(),
            call_id: Some(call_id),
            call_type: Some(CALL_TYPE_INBOUND),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewConversation { .. } => "event_new_conversation",
            Self::ConversationStarted { .. } => "event_conversation_started",
            Self::ConversationAccepted { .. } => "event_conversation_accepted",
            Self::ConversationFinished { .. } => "event_conversation_finished",
            Self::NewMessage { .. } => "event_new_message",
            Self::MessageStatusUpdated { .. } => "event_message_status_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_offer_wire_shape() {
        let event = PushEvent::call_offer(
            "abc".into(),
            Contact {
                id: "c1".into(),
                name: "".into(),
                number: "061222333".into(),
            },
            "1700000000.7".into(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "event_new_conversation");
        assert_eq!(json["conversationId"], "abc");
        assert_eq!(json["type"], "phone_call");
        assert_eq!(json["callId"], "1700000000.7");
        assert_eq!(json["callType"], 1);
        assert!(json.get("messages").is_none());
    }

    #[test]
    fn name_matches_tag() {
        let event = PushEvent::ConversationAccepted {
            conversation_id: "x".into(),
            agent: "101".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["conversationId"], "x");
    }
}
