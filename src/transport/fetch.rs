//! # One-shot status requests.
//!
//! [`StatusFetch`] is the poller's only way to reach the backend. One call,
//! one [`StatusReport`]; the poller decides success or failure from the
//! report and never inspects transport internals.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// Result of one status request that reached a server.
///
/// `ok` mirrors HTTP 2xx. `parsed` is present only when the body parsed as
/// JSON; `ok` with no `parsed` means the server answered success with an
/// unusable body, which the poller counts as a failed tick.
#[derive(Clone, Debug)]
pub struct StatusReport {
    /// HTTP status code.
    pub status: u16,
    /// Whether the status code was a success (2xx).
    pub ok: bool,
    /// Raw response body.
    pub body: String,
    /// The body parsed as JSON, when it parsed.
    pub parsed: Option<Value>,
}

impl StatusReport {
    /// A successful report carrying `payload`.
    pub fn success(payload: Value) -> Self {
        Self {
            status: 200,
            ok: true,
            body: payload.to_string(),
            parsed: Some(payload),
        }
    }

    /// A reachable-but-failing report (non-2xx, empty body).
    pub fn failure(status: u16) -> Self {
        Self {
            status,
            ok: false,
            body: String::new(),
            parsed: None,
        }
    }
}

/// Fetches the current status of one polling target.
///
/// Implementations perform a single request and report what came back.
/// Reachable servers always produce `Ok(report)` whatever their status
/// code; `Err` is reserved for failures below HTTP (network down, DNS,
/// timeout).
#[async_trait]
pub trait StatusFetch: Send + Sync + 'static {
    /// Fetches status for `target`.
    async fn fetch_status(&self, target: &str) -> Result<StatusReport, TransportError>;
}

/// Extracts a player count from a status payload, tolerating the field
/// spellings different backend versions have used.
///
/// Tries, in order: `numPlayers`, `players.online`, `players.count`,
/// `online`, `count`, `playerCount`. Explicit `null`s fall through to the
/// next candidate. Numeric strings coerce; negatives, non-numeric values,
/// and missing fields all come back as `0`.
///
/// # Example
/// ```
/// use roomlink::parse_player_count;
/// use serde_json::json;
///
/// assert_eq!(parse_player_count(&json!({ "numPlayers": 12 })), 12);
/// assert_eq!(parse_player_count(&json!({ "players": { "online": "7" } })), 7);
/// assert_eq!(parse_player_count(&json!({ "count": -3 })), 0);
/// assert_eq!(parse_player_count(&json!({})), 0);
/// ```
pub fn parse_player_count(data: &Value) -> u64 {
    let players = data.get("players");
    let candidates = [
        data.get("numPlayers"),
        players.and_then(|p| p.get("online")),
        players.and_then(|p| p.get("count")),
        data.get("online"),
        data.get("count"),
        data.get("playerCount"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .map_or(0, coerce_count)
}

fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else if let Some(f) = n.as_f64() {
                clamp_f64(f)
            } else {
                0
            }
        }
        Value::String(s) => s.trim().parse::<f64>().map_or(0, clamp_f64),
        Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

fn clamp_f64(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_fallback_order() {
        assert_eq!(parse_player_count(&json!({ "numPlayers": 4 })), 4);
        assert_eq!(parse_player_count(&json!({ "players": { "online": 5 } })), 5);
        assert_eq!(parse_player_count(&json!({ "players": { "count": 6 } })), 6);
        assert_eq!(parse_player_count(&json!({ "online": 7 })), 7);
        assert_eq!(parse_player_count(&json!({ "count": 8 })), 8);
        assert_eq!(parse_player_count(&json!({ "playerCount": 9 })), 9);
    }

    #[test]
    fn test_earlier_field_wins() {
        let data = json!({ "numPlayers": 3, "online": 99, "playerCount": 50 });
        assert_eq!(parse_player_count(&data), 3);
    }

    #[test]
    fn test_explicit_null_falls_through() {
        let data = json!({ "numPlayers": null, "online": 11 });
        assert_eq!(parse_player_count(&data), 11);
    }

    #[test]
    fn test_zero_is_a_real_answer() {
        // A present zero must not fall through to a later field.
        let data = json!({ "numPlayers": 0, "online": 42 });
        assert_eq!(parse_player_count(&data), 0);
    }

    #[test]
    fn test_numeric_strings_coerce() {
        assert_eq!(parse_player_count(&json!({ "count": "17" })), 17);
        assert_eq!(parse_player_count(&json!({ "count": " 17 " })), 17);
    }

    #[test]
    fn test_garbage_clamps_to_zero() {
        assert_eq!(parse_player_count(&json!({ "count": "lots" })), 0);
        assert_eq!(parse_player_count(&json!({ "count": -5 })), 0);
        assert_eq!(parse_player_count(&json!({ "count": [1, 2] })), 0);
        assert_eq!(parse_player_count(&json!({ "count": {"n": 1} })), 0);
        assert_eq!(parse_player_count(&json!(null)), 0);
        assert_eq!(parse_player_count(&json!("not an object")), 0);
    }

    #[test]
    fn test_fractional_counts_floor() {
        assert_eq!(parse_player_count(&json!({ "count": 2.9 })), 2);
    }

    #[test]
    fn test_report_constructors() {
        let ok = StatusReport::success(json!({ "numPlayers": 1 }));
        assert!(ok.ok);
        assert_eq!(ok.status, 200);
        assert!(ok.parsed.is_some());

        let bad = StatusReport::failure(503);
        assert!(!bad.ok);
        assert_eq!(bad.status, 503);
        assert!(bad.parsed.is_none());
    }
}
