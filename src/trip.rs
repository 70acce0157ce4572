//! Typed view of an `andamentoTreno` response.
//!
//! Every field is optional. Absence is kept as `None` and is never folded
//! into zero, because zero is a legitimate delay. Timing values that arrive
//! as numeric strings are accepted; any other unexpected shape decodes as
//! `None` with a warning instead of failing the whole payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Train types the upstream uses for fully or partially cancelled runs.
pub const CANCELLED_TRAIN_TYPES: &[&str] = &["ST", "PP", "SI", "SF"];

/// `actualFermataType` value of a suppressed stop.
pub const DELETED_STOP_TYPE: i64 = 3;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripPayload {
    #[serde(rename = "numeroTreno", default, deserialize_with = "lenient_i64")]
    pub train_number: Option<i64>,
    #[serde(rename = "tipoTreno", default, deserialize_with = "lenient_string")]
    pub train_type: Option<String>,
    #[serde(rename = "categoria", default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(rename = "idOrigine", default, deserialize_with = "lenient_string")]
    pub origin_id: Option<String>,
    #[serde(rename = "origine", default, deserialize_with = "lenient_string")]
    pub origin: Option<String>,
    #[serde(rename = "idDestinazione", default, deserialize_with = "lenient_string")]
    pub destination_id: Option<String>,
    #[serde(rename = "destinazione", default, deserialize_with = "lenient_string")]
    pub destination: Option<String>,
    #[serde(rename = "provvedimento", default, deserialize_with = "lenient_i64")]
    pub provision: Option<i64>,
    #[serde(rename = "haCambiNumero", default, deserialize_with = "lenient_bool")]
    pub has_changed_number: Option<bool>,
    #[serde(rename = "riprogrammazione", default, deserialize_with = "lenient_string")]
    pub rescheduling: Option<String>,
    /// Epoch milliseconds of the scheduled departure day.
    #[serde(rename = "orarioPartenzaZero", default, deserialize_with = "lenient_i64")]
    pub scheduling_zero: Option<i64>,
    #[serde(rename = "fermate", default, deserialize_with = "lenient_stops")]
    pub stops: Vec<Stop>,
}

/// One station visit. Timings are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Stop {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(rename = "stazione", default, deserialize_with = "lenient_string")]
    pub station: Option<String>,
    #[serde(rename = "arrivo_teorico", default, deserialize_with = "lenient_i64")]
    pub planned_arrival: Option<i64>,
    #[serde(rename = "arrivoReale", default, deserialize_with = "lenient_i64")]
    pub actual_arrival: Option<i64>,
    #[serde(rename = "partenza_teorica", default, deserialize_with = "lenient_i64")]
    pub planned_departure: Option<i64>,
    #[serde(rename = "partenzaReale", default, deserialize_with = "lenient_i64")]
    pub actual_departure: Option<i64>,
    #[serde(rename = "actualFermataType", default, deserialize_with = "lenient_i64")]
    pub stop_type: Option<i64>,
}

impl Stop {
    pub fn is_deleted(&self) -> bool {
        self.stop_type == Some(DELETED_STOP_TYPE)
    }
}

impl TripPayload {
    /// Reasons this run looks cancelled or altered. Empty for a regular run.
    pub fn deletion_signals(&self) -> Vec<&'static str> {
        let mut signals = Vec::new();
        if self
            .train_type
            .as_deref()
            .is_some_and(|t| CANCELLED_TRAIN_TYPES.contains(&t))
        {
            signals.push("cancelled_train_type");
        }
        if self.provision == Some(1) {
            signals.push("provision");
        }
        if self.has_changed_number == Some(true) {
            signals.push("changed_number");
        }
        if self
            .rescheduling
            .as_deref()
            .is_some_and(|r| !r.is_empty() && r != "N")
        {
            signals.push("rescheduled");
        }
        signals
    }

    pub fn is_deleted(&self) -> bool {
        !self.deletion_signals().is_empty()
    }

    pub fn deleted_stop_count(&self) -> usize {
        self.stops.iter().filter(|s| s.is_deleted()).count()
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i64))
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Null => None,
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(value = %s, "Non-numeric value where a number was expected");
                None
            }
        },
        other => {
            warn!(value = %other, "Unexpected value where a number was expected");
            None
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

/// Decodes the stop list one element at a time. A stop that is not an
/// object, or does not decode, is dropped with a warning; the rest of the
/// trip survives.
fn lenient_stops<'de, D>(deserializer: D) -> Result<Vec<Stop>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(value = %other, "Stop list is not an array, ignoring it");
            return Ok(Vec::new());
        }
    };

    let stops = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if !item.is_object() {
                warn!(index, value = %item, "Skipping stop that is not an object");
                return None;
            }
            match serde_json::from_value::<Stop>(item) {
                Ok(stop) => Some(stop),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable stop");
                    None
                }
            }
        })
        .collect();
    Ok(stops)
}
