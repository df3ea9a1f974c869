use anyhow::{anyhow, Result};
use serde_json::{json, Value};

/// One Engine.IO v4 text frame, with Socket.IO messages decoded on the default namespace
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Handshake, carries `sid`, `pingInterval` and `pingTimeout`
    Open(Value),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace joined
    Connect(Value),
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(Value),
    /// A message on another namespace or of a type we never expect
    Unhandled(String),
}

impl Packet {
    pub fn parse(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or_else(|| anyhow!("Empty Engine.IO frame"))?;
        let rest = chars.as_str();

        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(rest)?),
            '1' => Self::Close,
            '2' => Self::Ping,
            '3' => Self::Pong,
            '6' => Self::Noop,
            '4' => Self::parse_message(rest)?,
            _ => Self::Unhandled(frame.to_string()),
        })
    }

    fn parse_message(message: &str) -> Result<Self> {
        let mut chars = message.chars();
        let kind = chars.next().ok_or_else(|| anyhow!("Empty Socket.IO message"))?;
        let rest = chars.as_str();
        if rest.starts_with('/') {
            return Ok(Self::Unhandled(format!("4{}", message)));
        }

        let json_value = |text: &str| -> Result<Value> {
            if text.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(serde_json::from_str(text)?)
            }
        };

        Ok(match kind {
            '0' => Self::Connect(json_value(rest)?),
            '1' => Self::Disconnect,
            '2' => {
                // An ack id may precede the payload
                let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());
                let mut items = match json_value(payload)? {
                    Value::Array(items) => items.into_iter(),
                    other => return Err(anyhow!("Unexpected event payload {}", other)),
                };
                let name = items
                    .next()
                    .and_then(|name| name.as_str().map(str::to_string))
                    .ok_or_else(|| anyhow!("Event without a name"))?;
                Self::Event {
                    name,
                    data: items.next().unwrap_or(Value::Null),
                }
            }
            '4' => Self::ConnectError(json_value(rest)?),
            _ => Self::Unhandled(format!("4{}", message)),
        })
    }
}

/// Join the default namespace
pub const CONNECT: &str = "40";
pub const PONG: &str = "3";

/// `42["name",data]`
pub fn encode_event(name: &str, data: &Value) -> String {
    format!("42{}", json!([name, data]))
}

/// The learner message SensAI expects
pub fn learner_message(message: &str) -> Value {
    json!({
        "type": "learner",
        "content": {
            "message": message,
            "terminal": "...",
            "file": "...",
        }
    })
}

/// The assistant's reply text inside an event payload
pub fn reply_text(data: &Value) -> Option<&str> {
    data.pointer("/content/message").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_engine_packets() {
        let open = Packet::parse(r#"0{"sid":"abc","pingInterval":25000,"pingTimeout":20000}"#).unwrap();
        assert_eq!(
            open,
            Packet::Open(json!({"sid": "abc", "pingInterval": 25000, "pingTimeout": 20000}))
        );
        assert_eq!(Packet::parse("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::parse("1").unwrap(), Packet::Close);
        assert!(Packet::parse("").is_err());
    }

    #[test]
    fn test_socket_messages() {
        assert_eq!(
            Packet::parse(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Connect(json!({"sid": "xyz"}))
        );
        assert_eq!(
            Packet::parse(r#"42["new_interaction",{"content":{"message":"hi"}}]"#).unwrap(),
            Packet::Event {
                name: "new_interaction".to_string(),
                data: json!({"content": {"message": "hi"}}),
            }
        );
        assert_eq!(
            Packet::parse(r#"4212["ack",1]"#).unwrap(),
            Packet::Event {
                name: "ack".to_string(),
                data: json!(1),
            }
        );
        assert!(matches!(
            Packet::parse(r#"42/admin,["x"]"#).unwrap(),
            Packet::Unhandled(_)
        ));
        assert_eq!(
            Packet::parse(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError(json!({"message": "Not authorized"}))
        );
    }

    #[test]
    fn test_encode_learner_event() {
        let frame = encode_event("new_interaction", &learner_message("why segfault?"));
        assert!(frame.starts_with(r#"42["new_interaction",{"#));
        let Packet::Event { name, data } = Packet::parse(&frame).unwrap() else {
            panic!("not an event");
        };
        assert_eq!(name, "new_interaction");
        assert_eq!(data["type"], "learner");
        assert_eq!(data["content"]["message"], "why segfault?");
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(reply_text(&json!({"content": {"message": "**Hi**"}})), Some("**Hi**"));
        assert_eq!(reply_text(&json!({})), None);
    }
}
