//! Realtime side of the backend over a WebSocket.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use washcall_traits::{BoxError, Incoming, Realtime, RealtimeStream};

use crate::error::{Result, TransportError};
use crate::http::normalize_base;

/// Derive the status-update socket URL from the REST base URL.
///
/// `http` becomes `ws` and `https` becomes `wss`; the token rides in the
/// query string.
pub fn ws_url(base_url: &str, path: &str, token: Option<&str>) -> Result<String> {
    let base = normalize_base(base_url)?;
    let rest = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(TransportError::InvalidUrl(base));
    };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(match token.filter(|t| !t.is_empty()) {
        Some(t) => format!("{rest}{path}?token={t}"),
        None => format!("{rest}{path}"),
    })
}

pub struct WsRealtime {
    url: String,
    read_timeout: Duration,
}

impl WsRealtime {
    pub fn new(url: String, read_timeout: Duration) -> Self {
        Self { url, read_timeout }
    }

    /// URL without the query string, safe for logs.
    fn redacted(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

fn set_read_timeout(
    socket: &WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> std::io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(s) => s.set_read_timeout(Some(timeout)),
        MaybeTlsStream::Rustls(s) => s.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

impl Realtime for WsRealtime {
    fn connect(&mut self) -> std::result::Result<Box<dyn RealtimeStream>, BoxError> {
        tracing::debug!(url = self.redacted(), "connecting websocket");
        let (socket, _resp) = tungstenite::connect(self.url.as_str()).map_err(|e| match e {
            tungstenite::Error::Http(resp) if resp.status().as_u16() == 401 => {
                TransportError::Unauthorized
            }
            tungstenite::Error::Http(resp) => TransportError::Status {
                code: resp.status().as_u16(),
                detail: "websocket upgrade rejected".to_string(),
            },
            tungstenite::Error::Io(io) => TransportError::Network(io.to_string()),
            other => TransportError::WebSocket(other.to_string()),
        })?;
        set_read_timeout(&socket, self.read_timeout)?;
        tracing::info!(url = self.redacted(), "websocket connected");
        Ok(Box::new(WsStream { socket }))
    }
}

struct WsStream {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl RealtimeStream for WsStream {
    fn recv(&mut self) -> std::result::Result<Incoming, BoxError> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Incoming::Text(text)),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => Ok(Incoming::Text(text)),
                Err(_) => {
                    tracing::debug!("ignoring non-utf8 binary frame");
                    Ok(Incoming::Idle)
                }
            },
            Ok(Message::Close(frame)) => {
                tracing::debug!(?frame, "server closed websocket");
                Ok(Incoming::Closed)
            }
            // Pings are answered by tungstenite on the next read.
            Ok(_) => Ok(Incoming::Idle),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(Incoming::Idle)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(Incoming::Closed)
            }
            Err(e) => Err(Box::new(TransportError::WebSocket(e.to_string()))),
        }
    }
}

impl Drop for WsStream {
    fn drop(&mut self) {
        if let Err(e) = self.socket.close(None) {
            tracing::trace!(error = %e, "websocket close on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:8000", Some("abc"), "ws://localhost:8000/status_update?token=abc")]
    #[case("https://server.washcall.space/", Some("t"), "wss://server.washcall.space/status_update?token=t")]
    #[case("localhost:8000", None, "ws://localhost:8000/status_update")]
    #[case("http://localhost:8000", Some(""), "ws://localhost:8000/status_update")]
    fn ws_url_follows_base(#[case] base: &str, #[case] token: Option<&str>, #[case] expected: &str) {
        assert_eq!(ws_url(base, "/status_update", token).unwrap(), expected);
    }

    #[test]
    fn ws_url_adds_leading_slash() {
        assert_eq!(
            ws_url("http://h", "status_update", None).unwrap(),
            "ws://h/status_update"
        );
    }

    #[test]
    fn redacted_url_hides_token() {
        let rt = WsRealtime::new(
            "ws://h/status_update?token=secret".to_string(),
            Duration::from_millis(100),
        );
        assert_eq!(rt.redacted(), "ws://h/status_update");
    }

    #[test]
    fn connect_to_closed_port_fails() {
        // Port 1 on localhost is reserved and never listening in CI.
        let mut rt = WsRealtime::new("ws://127.0.0.1:1/status_update".to_string(), Duration::from_millis(100));
        assert!(rt.connect().is_err());
    }
}
