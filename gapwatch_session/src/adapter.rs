//! Boundary adapter: turn outside-world integers and wire messages into core `Outcome`s.
//!
//! Everything that can carry an out-of-domain value passes through here before it
//! reaches the session:
//! - single outcomes from the input surface
//! - peer messages (one spin, or a full sequence)
//! - import payloads (flat JSON arrays)
//!
//! Validation is all-or-nothing: a payload with one bad value is rejected whole.

use serde::{Deserialize, Serialize};

use gapwatch_core::{GapwatchError, Outcome, Result};

/// A message on the peer-replication channel.
///
/// Wire shape is JSON tagged by `"type"`: `{"type":"spin","number":17}`,
/// `{"type":"sync","data":[...]}`. Chat payloads are parsed so they can be
/// recognised and dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PeerMessage {
    Spin {
        number: i64,
    },
    Sync {
        data: Vec<i64>,
    },
    Chat {
        #[serde(default)]
        user: String,
        #[serde(default)]
        message: String,
    },
}

impl PeerMessage {
    pub fn spin(outcome: Outcome) -> Self {
        PeerMessage::Spin {
            number: outcome.value() as i64,
        }
    }

    pub fn sync(outcomes: &[Outcome]) -> Self {
        PeerMessage::Sync {
            data: outcomes.iter().map(|o| o.value() as i64).collect(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| GapwatchError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GapwatchError::Parse(e.to_string()))
    }
}

/// Validate a batch of raw values. The first bad value rejects the batch.
pub fn validate_outcomes(values: &[i64]) -> Result<Vec<Outcome>> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            Outcome::new(value).map_err(|_| GapwatchError::Import { index, value })
        })
        .collect()
}

/// Parse an import payload: a flat JSON array of integers in 0..=36.
pub fn parse_import_json(s: &str) -> Result<Vec<Outcome>> {
    let values: Vec<i64> =
        serde_json::from_str(s).map_err(|e| GapwatchError::Parse(e.to_string()))?;
    validate_outcomes(&values)
}

/// Serialize outcomes verbatim as a flat JSON array.
pub fn export_json(outcomes: &[Outcome]) -> Result<String> {
    serde_json::to_string(outcomes).map_err(|e| GapwatchError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_messages_round_trip_wire_shape() {
        let m = PeerMessage::from_json(r#"{"type":"spin","number":17}"#).unwrap();
        assert_eq!(m, PeerMessage::Spin { number: 17 });

        let m = PeerMessage::from_json(r#"{"type":"sync","data":[1,2,3]}"#).unwrap();
        assert_eq!(m, PeerMessage::Sync { data: vec![1, 2, 3] });

        let m = PeerMessage::from_json(r#"{"type":"chat","user":"a","message":"hi","ts":1}"#).unwrap();
        assert!(matches!(m, PeerMessage::Chat { .. }));

        assert_eq!(
            PeerMessage::spin(Outcome::ZERO).to_json().unwrap(),
            r#"{"type":"spin","number":0}"#
        );
    }

    #[test]
    fn unknown_message_type_is_parse_error() {
        assert!(matches!(
            PeerMessage::from_json(r#"{"type":"emoji"}"#),
            Err(GapwatchError::Parse(_))
        ));
    }

    #[test]
    fn import_rejects_whole_batch() {
        assert_eq!(
            validate_outcomes(&[3, 36, 37, 1]),
            Err(GapwatchError::Import { index: 2, value: 37 })
        );
        assert!(matches!(parse_import_json("[1, 2.5]"), Err(GapwatchError::Parse(_))));
        assert!(matches!(parse_import_json("{\"a\":1}"), Err(GapwatchError::Parse(_))));
        assert_eq!(parse_import_json("[0, 36]").unwrap().len(), 2);
    }

    #[test]
    fn export_is_flat_array() {
        let v = validate_outcomes(&[5, 0, 36]).unwrap();
        assert_eq!(export_json(&v).unwrap(), "[5,0,36]");
    }
}
