use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use super::packet::{encode_event, learner_message, reply_text, Packet, CONNECT, PONG};
use crate::api::{load_cookie, DojoApi, DojoClient};
use crate::app::Config;
use crate::utils::{info, paint, print_markdown, warn, DojoError};

const SOCKET_PATH: &str = "/sensai/socket.io/?EIO=4&transport=websocket";
const INTERACTION_EVENT: &str = "new_interaction";

/// Websocket URL of the SensAI Engine.IO endpoint
pub fn socket_url(base_url: &str) -> Result<String> {
    let base = base_url.trim_end_matches('/');
    let url = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}{}", rest, SOCKET_PATH)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}{}", rest, SOCKET_PATH)
    } else {
        anyhow::bail!("Base URL {} is not an http(s) URL", base_url);
    };
    Ok(url)
}

fn prompt() {
    info(format!(
        "Type message and press enter (press {} to exit):",
        paint("bold cyan", "^C")
    ));
}

/// Chat with SensAI about the running challenge
pub async fn sensai(config: &Config, client: &DojoClient) -> Result<()> {
    if !client.docker_status().await?.success {
        return Err(DojoError::no_challenge().into());
    }
    let cookie_file = config.cookie_file();
    if !cookie_file.is_file() {
        return Err(DojoError::NotLoggedIn.into());
    }
    let session = load_cookie(&cookie_file)?;

    // The landing page hands out the SensAI session cookie
    client.get_page("/sensai/").await?;
    let sensai_session = client
        .jar_cookie("sensai_session", "/sensai/")
        .context("SensAI did not start a session")?;

    let mut request = socket_url(&config.base_url)?.into_client_request()?;
    request.headers_mut().insert(
        COOKIE,
        HeaderValue::from_str(&format!("session={}; sensai_session={}", session, sensai_session))?,
    );

    tracing::debug!("Connecting to {}", request.uri());
    let (socket, _) = tokio_tungstenite::connect_async(request)
        .await
        .context("Failed to connect to SensAI")?;
    let (mut sink, mut stream) = socket.split();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut connected = false;
    let mut awaiting_reply = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line(), if connected && !awaiting_reply => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    prompt();
                    continue;
                }
                let frame = encode_event(INTERACTION_EVENT, &learner_message(&line));
                sink.send(Message::Text(frame)).await?;
                awaiting_reply = true;
            }
            message = stream.next() => {
                let Some(message) = message else {
                    warn("SensAI closed the connection.");
                    break;
                };
                let text = match message? {
                    Message::Text(text) => text,
                    Message::Close(_) => {
                        warn("SensAI closed the connection.");
                        break;
                    }
                    _ => continue,
                };

                match Packet::parse(&text)? {
                    Packet::Open(handshake) => {
                        tracing::debug!("Engine.IO handshake {}", handshake);
                        sink.send(Message::Text(CONNECT.to_string())).await?;
                    }
                    Packet::Ping => sink.send(Message::Text(PONG.to_string())).await?,
                    Packet::Connect(_) => {
                        connected = true;
                        prompt();
                    }
                    Packet::Event { name, data } => {
                        tracing::debug!("SensAI event {}", name);
                        if let Some(reply) = reply_text(&data) {
                            info("SensAI response:");
                            print_markdown(reply);
                            awaiting_reply = false;
                            prompt();
                        }
                    }
                    Packet::ConnectError(reason) => {
                        anyhow::bail!("SensAI refused the connection: {}", reason);
                    }
                    Packet::Close | Packet::Disconnect => {
                        warn("SensAI closed the connection.");
                        break;
                    }
                    Packet::Pong | Packet::Noop => {}
                    Packet::Unhandled(frame) => tracing::debug!("Ignoring frame {}", frame),
                }
            }
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_socket_url() {
        assert_eq!(
            socket_url("https://pwn.college/").unwrap(),
            "wss://pwn.college/sensai/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("http://localhost:8080").unwrap(),
            "ws://localhost:8080/sensai/socket.io/?EIO=4&transport=websocket"
        );
        assert!(socket_url("pwn.college").is_err());
    }
}
