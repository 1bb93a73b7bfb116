//! Human-readable error descriptions and structured JSON error formatting.

use washcall_core::ClientError;

fn find_client_error(err: &eyre::Report) -> Option<&ClientError> {
    err.chain().find_map(|e| e.downcast_ref::<ClientError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = find_client_error(err) {
        return match ce {
            ClientError::Unauthorized => {
                "What happened: The server rejected the session (HTTP 401).\nLikely causes: The token expired or was never set.\nHow to fix: Log in again and set WASHCALL_TOKEN or server.token in the config.".to_string()
            }
            ClientError::Transport(msg) => format!(
                "What happened: The server could not be reached ({msg}).\nLikely causes: Server down, wrong server.base_url, or no network.\nHow to fix: Check --server / server.base_url, or run with --simulate to use the built-in simulation."
            ),
            ClientError::Status { code, detail } => format!(
                "What happened: The server refused the request (HTTP {code}: {detail}).\nLikely causes: The machine state changed on the server, or the request was invalid.\nHow to fix: Run `washcall list` to refresh and try again."
            ),
            ClientError::UnknownMachine(id) => format!(
                "What happened: Machine {id} is not in the room list.\nLikely causes: Wrong --machine value.\nHow to fix: Run `washcall list` to see valid machine ids."
            ),
            ClientError::InvalidAction(why) => format!(
                "What happened: That action is not available right now ({why}).\nLikely causes: The machine is already running, idle, or the course name is not offered.\nHow to fix: Check the machine with `washcall list` and the ui.courses list in the config."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: The server sent data this client does not understand.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("config") {
        let cause = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid or unreadable: {msg}{cause}.\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match find_client_error(err) {
        Some(ClientError::Unauthorized) => 3,
        Some(ClientError::Transport(_) | ClientError::Status { .. }) => 4,
        Some(ClientError::InvalidAction(_)) => 5,
        Some(ClientError::UnknownMachine(_)) => 6,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match find_client_error(err) {
        Some(ClientError::Unauthorized) => "Unauthorized",
        Some(ClientError::Transport(_)) => "Transport",
        Some(ClientError::Status { .. }) => "Status",
        Some(ClientError::InvalidAction(_)) => "InvalidAction",
        Some(ClientError::UnknownMachine(_)) => "UnknownMachine",
        Some(_) => "Decode",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(ClientError::Status { code, detail }) = find_client_error(err) {
        obj["details"] = json!({ "code": code, "detail": detail });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    fn report(e: ClientError) -> eyre::Report {
        Err::<(), _>(e).wrap_err("starting course").unwrap_err()
    }

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(exit_code_for_error(&report(ClientError::Unauthorized)), 3);
        assert_eq!(
            exit_code_for_error(&report(ClientError::Transport("refused".into()))),
            4
        );
        assert_eq!(
            exit_code_for_error(&report(ClientError::InvalidAction("busy"))),
            5
        );
        assert_eq!(exit_code_for_error(&report(ClientError::UnknownMachine(9))), 6);
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn json_carries_status_details() {
        let err = report(ClientError::Status {
            code: 409,
            detail: "machine is already in use".into(),
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Status");
        assert_eq!(v["exit_code"], 4);
        assert_eq!(v["details"]["code"], 409);
    }

    #[test]
    fn humanize_explains_unauthorized() {
        let msg = humanize(&report(ClientError::Unauthorized));
        assert!(msg.contains("WASHCALL_TOKEN"));
    }
}
