// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AMI wire format: `Key: Value` lines, packets separated by a blank line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One AMI response or event, fields in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub fields: Vec<(String, String)>,
}

impl Packet {
    /// First value for `key`, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn event_name(&self) -> Option<&str> {
        self.get("Event")
    }

    pub fn action_id(&self) -> Option<&str> {
        self.get("ActionID")
    }

    /// `Response: Success` (or `Goodbye` for logoff).
    pub fn is_success(&self) -> bool {
        self.get("Response")
            .is_some_and(|r| r.eq_ignore_ascii_case("success") || r.eq_ignore_ascii_case("goodbye"))
    }
}

/// Reads the next packet. Returns `Ok(None)` at end of stream; a packet cut
/// short by EOF is discarded.
pub async fn read_packet<R>(reader: &mut R) -> std::io::Result<Option<Packet>>
where
    R: AsyncBufRead + Unpin,
{
    let mut packet = Packet::default();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            if packet.fields.is_empty() {
                continue;
            }
            return Ok(Some(packet));
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            packet
                .fields
                .push((key.trim().to_string(), value.trim().to_string()));
        }
    }
}

/// Serializes an action with its correlation id.
pub fn encode_action(name: &str, action_id: &str, params: &[(&str, &str)]) -> String {
    let mut out = format!("Action: {name}\r\nActionID: {action_id}\r\n");
    for (key, value) in params {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_consecutive_packets() {
        let wire = "Response: Success\r\nActionID: 1\r\nMessage: Added\r\n\r\n\
                    Event: AgentCalled\r\nInterface: PJSIP/101\r\nCallerIDNum: 061\r\n\r\n";
        let mut reader = BufReader::new(wire.as_bytes());

        let first = read_packet(&mut reader).await.unwrap().unwrap();
        assert!(first.is_success());
        assert_eq!(first.action_id(), Some("1"));
        assert_eq!(first.get("message"), Some("Added"));

        let second = read_packet(&mut reader).await.unwrap().unwrap();
        assert_eq!(second.event_name(), Some("AgentCalled"));
        assert_eq!(second.get("Interface"), Some("PJSIP/101"));

        assert!(read_packet(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn values_may_contain_colons() {
        let wire = "Event: Newchannel\nChannel: PJSIP/101-0001\nTimestamp: 1700000000.1\nUniqueid: a:b\n\n";
        let mut reader = BufReader::new(wire.as_bytes());
        let packet = read_packet(&mut reader).await.unwrap().unwrap();
        assert_eq!(packet.get("uniqueid"), Some("a:b"));
    }

    #[test]
    fn encodes_action_block() {
        let wire = encode_action("QueueAdd", "7", &[("Queue", "SalesQueue"), ("Interface", "PJSIP/101")]);
        assert_eq!(
            wire,
            "Action: QueueAdd\r\nActionID: 7\r\nQueue: SalesQueue\r\nInterface: PJSIP/101\r\n\r\n"
        );
    }
}
