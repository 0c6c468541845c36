use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::engine::{Cancelled, Placed};
use crate::core::reason::Reason;
use crate::utils::error::BetclickResult;

pub const DEFAULT_PLATFORM: &str = "Pragmatic";
pub const DEFAULT_SIDE: &str = "Player";

/// Messages sent by the controller.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Inbound {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "assignment")]
    Assignment {
        #[serde(default, deserialize_with = "lenient_string")]
        pc: Option<String>,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(rename = "placeBet")]
    PlaceBet {
        #[serde(default)]
        amount: Value,
        #[serde(default = "default_side")]
        side: String,
        #[serde(default = "default_platform")]
        platform: String,
    },
    #[serde(rename = "cancelBet")]
    CancelBet,
    #[serde(other)]
    Unknown,
}

fn default_side() -> String {
    DEFAULT_SIDE.to_string()
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Reads a wager from a number or a numeric string. Anything else, including
/// fractional amounts, becomes 0 and is rejected by the engine.
pub fn amount_value(raw: &Value) -> i64 {
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    };
    parsed.unwrap_or(0)
}

fn whole(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

/// Messages sent to the controller.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outbound {
    Hello {
        token: String,
    },
    RequestAssignment,
    Pong,
    Register {
        pc: String,
    },
    BetSuccess {
        platform: String,
        amount: Value,
        side: String,
    },
    BetError {
        message: String,
        #[serde(rename = "errorType")]
        error_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        platform: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        side: Option<String>,
    },
}

impl Outbound {
    pub fn placed(result: &Result<Placed, Reason>, platform: &str, amount: &Value, side: &str) -> Outbound {
        match result {
            Ok(_) => Outbound::BetSuccess {
                platform: platform.to_string(),
                amount: amount.clone(),
                side: side.to_string(),
            },
            Err(reason) => Outbound::BetError {
                message: reason.message().to_string(),
                error_type: reason.code().to_string(),
                platform: Some(platform.to_string()),
                amount: Some(amount.clone()),
                side: Some(side.to_string()),
            },
        }
    }

    /// Cancel only answers on failure.
    pub fn cancelled(result: &Result<Cancelled, Reason>) -> Option<Outbound> {
        result.as_ref().err().map(|reason| Outbound::BetError {
            message: reason.message().to_string(),
            error_type: reason.code().to_string(),
            platform: None,
            amount: None,
            side: None,
        })
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    body: &'a Outbound,
    #[serde(skip_serializing_if = "Option::is_none")]
    pc: Option<&'a str>,
    timestamp: String,
}

/// Serialises a message with the assigned pc and a UTC timestamp.
pub fn encode(message: &Outbound, pc: Option<&str>, now: DateTime<Utc>) -> BetclickResult<String> {
    let envelope = Envelope {
        body: message,
        pc,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn decode(text: &str) -> BetclickResult<Inbound> {
    Ok(serde_json::from_str(text)?)
}
