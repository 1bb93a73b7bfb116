//! REST side of the backend over blocking HTTP.

use std::time::Duration;

use serde_json::{Value, json};
use washcall_traits::{Backend, BoxError};

use crate::error::{Result, TransportError};

pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base(base_url)?;
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self {
            agent,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, method, "request");
        let req = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn get(&self, path: &str) -> Result<String> {
        read_response(self.request("GET", path).call())
    }

    fn post(&self, path: &str, body: Option<&Value>) -> Result<String> {
        let req = self
            .request("POST", path)
            .set("Content-Type", "application/json");
        read_response(match body {
            Some(b) => req.send_string(&b.to_string()),
            None => req.call(),
        })
    }
}

fn read_response(resp: std::result::Result<ureq::Response, ureq::Error>) -> Result<String> {
    match resp {
        Ok(r) => Ok(r.into_string()?),
        Err(ureq::Error::Status(code, r)) => {
            let text = r.into_string().unwrap_or_default();
            Err(status_error(code, &text))
        }
        Err(ureq::Error::Transport(t)) => Err(TransportError::Network(t.to_string())),
    }
}

/// Accept `host:port` as plain http and drop trailing slashes.
pub(crate) fn normalize_base(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(TransportError::InvalidUrl("empty base url".to_string()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else if trimmed.contains("://") {
        Err(TransportError::InvalidUrl(format!(
            "unsupported scheme in {trimmed:?}"
        )))
    } else {
        Ok(format!("http://{trimmed}"))
    }
}

/// Build the error for a non-2xx response. The server's JSON `detail` wins
/// over the raw body.
pub(crate) fn status_error(code: u16, body: &str) -> TransportError {
    if code == 401 {
        return TransportError::Unauthorized;
    }
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => match obj.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    };
    let detail = if detail.is_empty() {
        "request failed".to_string()
    } else {
        detail
    };
    TransportError::Status { code, detail }
}

impl Backend for HttpBackend {
    fn load_machines(&mut self) -> std::result::Result<String, BoxError> {
        Ok(self.post("/load", None)?)
    }

    fn start_course(&mut self, machine_id: u32, course: &str) -> std::result::Result<String, BoxError> {
        let body = json!({ "machine_id": machine_id, "course_name": course });
        Ok(self.post("/start_course", Some(&body))?)
    }

    fn toggle_notify(&mut self, machine_id: u32, subscribe: bool) -> std::result::Result<String, BoxError> {
        let body = json!({ "machine_id": machine_id, "isusing": u8::from(subscribe) });
        Ok(self.post("/notify_me", Some(&body))?)
    }

    fn congestion(&mut self) -> std::result::Result<String, BoxError> {
        Ok(self.get("/statistics/congestion")?)
    }

    fn congestion_tip(&mut self) -> std::result::Result<String, BoxError> {
        Ok(self.get("/tip")?)
    }

    fn reserve_room(&mut self, room_id: u32, reserve: bool) -> std::result::Result<String, BoxError> {
        let body = json!({ "room_id": room_id, "isreserved": u8::from(reserve) });
        Ok(self.post("/reserve", Some(&body))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:8000/", "http://localhost:8000")]
    #[case("https://server.washcall.space", "https://server.washcall.space")]
    #[case("  127.0.0.1:8000 ", "http://127.0.0.1:8000")]
    fn base_urls_are_normalized(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_base(input).unwrap(), expected);
    }

    #[test]
    fn bad_base_urls_are_rejected() {
        assert!(matches!(normalize_base(""), Err(TransportError::InvalidUrl(_))));
        assert!(matches!(
            normalize_base("ftp://example.com"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn status_errors_prefer_json_detail() {
        match status_error(409, r#"{"detail":"machine is already in use"}"#) {
            TransportError::Status { code, detail } => {
                assert_eq!(code, 409);
                assert_eq!(detail, "machine is already in use");
            }
            other => panic!("unexpected {other:?}"),
        }
        match status_error(502, "Bad Gateway\n") {
            TransportError::Status { detail, .. } => assert_eq!(detail, "Bad Gateway"),
            other => panic!("unexpected {other:?}"),
        }
        match status_error(500, "") {
            TransportError::Status { detail, .. } => assert_eq!(detail, "request failed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unauthorized_ignores_body() {
        assert!(matches!(
            status_error(401, r#"{"detail":"token expired"}"#),
            TransportError::Unauthorized
        ));
    }

    #[test]
    fn blank_token_is_not_sent() {
        let b = HttpBackend::new("localhost:1", Some("  ".to_string()), Duration::from_millis(10))
            .unwrap();
        assert!(b.token.is_none());
        assert_eq!(b.base_url(), "http://localhost:1");
    }

    #[test]
    fn unreachable_server_is_a_network_error_for_reads_too() {
        let mut b = HttpBackend::new("127.0.0.1:9", None, Duration::from_millis(300)).unwrap();
        let err = b.congestion_tip().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::Network(_))
        ));
    }
}
