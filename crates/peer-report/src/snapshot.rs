//! Channel and forwarding snapshots as exported by the node, plus the lenient
//! numeric coercion their amount fields need.

use crate::error::{CoercionError, SnapshotError};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use std::{fs, io::ErrorKind, path::Path};
use tracing::warn;

/// NOTE:
/// - Every field can be missing or carry the wrong type, so fields stay raw JSON and
///   are interpreted per record; one bad record must not fail the whole file
/// - `None` means the key is absent, an explicit `null` is kept as `Value::Null`
/// - Only the fields the report needs are kept
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelRecord {
    #[serde(default, deserialize_with = "present")]
    pub peer_alias: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub channel_point: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub local_balance: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForwardingEvent {
    #[serde(default, deserialize_with = "present")]
    pub peer_alias_in: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub peer_alias_out: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub fee_msat: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelSnapshot {
    #[serde(default)]
    pub channels: Option<Vec<ChannelRecord>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForwardingSnapshot {
    #[serde(default)]
    pub forwarding_events: Option<Vec<ForwardingEvent>>,
}

impl ChannelRecord {
    pub fn channel_point(&self) -> Option<&str> {
        text_field(self.channel_point.as_ref(), "channel_point")
    }

    /// Funding transaction id, the part of `channel_point` before the output index.
    pub fn funding_txid(&self) -> Option<&str> {
        self.channel_point()
            .map(|point| point.split_once(':').map_or(point, |(txid, _)| txid))
    }

    pub fn alias(&self) -> Option<&str> {
        text_field(self.peer_alias.as_ref(), "peer_alias")
    }
}

impl ForwardingEvent {
    pub fn alias_in(&self) -> Option<&str> {
        text_field(self.peer_alias_in.as_ref(), "peer_alias_in")
    }

    pub fn alias_out(&self) -> Option<&str> {
        text_field(self.peer_alias_out.as_ref(), "peer_alias_out")
    }
}

/// Non-empty string value; anything else reads as absent, with a warning for
/// values of the wrong type.
fn text_field<'a>(value: Option<&'a Value>, field: &str) -> Option<&'a str> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.as_str()),
        Value::String(_) | Value::Null => None,
        other => {
            warn!("Ignoring non-string {} {}", field, other);
            None
        }
    }
}

impl ChannelSnapshot {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        read_json(path)
    }

    /// Channels in file order; a missing `channels` key reads as empty.
    pub fn into_channels(self, source: &Path) -> Vec<ChannelRecord> {
        self.channels.unwrap_or_else(|| {
            warn!(
                "'channels' key not found in {}, treating it as empty",
                source.display()
            );
            Vec::new()
        })
    }
}

impl ForwardingSnapshot {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        read_json(path)
    }

    /// Events in file order; a missing `forwarding_events` key reads as empty.
    pub fn into_events(self, source: &Path) -> Vec<ForwardingEvent> {
        self.forwarding_events.unwrap_or_else(|| {
            warn!(
                "'forwarding_events' key not found in {}, treating it as empty",
                source.display()
            );
            Vec::new()
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SnapshotError::NotFound(path.to_path_buf()),
        _ => SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_json::from_str(&contents).map_err(|source| SnapshotError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Coerces an integer-like JSON value into a non-negative amount.
///
/// An absent field is `0`. Integers, integral strings (surrounding whitespace allowed)
/// and booleans are accepted; floats are truncated toward zero. Anything else,
/// including `null` and negative amounts, is an error and the caller picks the default.
pub fn coerce_amount(value: Option<&Value>) -> Result<u64, CoercionError> {
    let Some(value) = value else {
        return Ok(0);
    };

    match value {
        Value::Number(number) => {
            if let Some(amount) = number.as_u64() {
                Ok(amount)
            } else if number.is_i64() {
                Err(CoercionError::Negative(number.to_string()))
            } else {
                coerce_float(number.as_f64().unwrap_or(f64::NAN), value)
            }
        }
        Value::String(raw) => {
            let trimmed = raw.trim();
            match trimmed.parse::<u64>() {
                Ok(amount) => Ok(amount),
                Err(_) if trimmed.parse::<i64>().is_ok() => {
                    Err(CoercionError::Negative(raw.clone()))
                }
                Err(_) => Err(CoercionError::Invalid(value.to_string())),
            }
        }
        Value::Bool(flag) => Ok(u64::from(*flag)),
        _ => Err(CoercionError::Invalid(value.to_string())),
    }
}

fn coerce_float(float: f64, original: &Value) -> Result<u64, CoercionError> {
    if !float.is_finite() {
        return Err(CoercionError::Invalid(original.to_string()));
    }
    let truncated = float.trunc();
    if truncated < 0.0 {
        return Err(CoercionError::Negative(original.to_string()));
    }
    if truncated >= u64::MAX as f64 {
        return Err(CoercionError::Invalid(original.to_string()));
    }
    Ok(truncated as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(None), Ok(0));
        assert_eq!(coerce_amount(Some(&json!(100000))), Ok(100000));
        assert_eq!(coerce_amount(Some(&json!("250000"))), Ok(250000));
        assert_eq!(coerce_amount(Some(&json!(" 42 "))), Ok(42));
        assert_eq!(coerce_amount(Some(&json!(12.9))), Ok(12));
        assert_eq!(coerce_amount(Some(&json!(true))), Ok(1));
    }

    #[test]
    fn test_coerce_amount_failures() {
        assert!(matches!(
            coerce_amount(Some(&json!(null))),
            Err(CoercionError::Invalid(_))
        ));
        assert!(matches!(
            coerce_amount(Some(&json!("12.5"))),
            Err(CoercionError::Invalid(_))
        ));
        assert!(matches!(
            coerce_amount(Some(&json!("abc"))),
            Err(CoercionError::Invalid(_))
        ));
        assert!(matches!(
            coerce_amount(Some(&json!([1, 2]))),
            Err(CoercionError::Invalid(_))
        ));
        assert!(matches!(
            coerce_amount(Some(&json!(-5))),
            Err(CoercionError::Negative(_))
        ));
        assert!(matches!(
            coerce_amount(Some(&json!("-5"))),
            Err(CoercionError::Negative(_))
        ));
    }

    #[test]
    fn test_funding_txid() {
        let channel = ChannelRecord {
            channel_point: Some(json!("abcd1234:1")),
            ..Default::default()
        };
        assert_eq!(channel.funding_txid(), Some("abcd1234"));

        let bare = ChannelRecord {
            channel_point: Some(json!("abcd1234")),
            ..Default::default()
        };
        assert_eq!(bare.funding_txid(), Some("abcd1234"));

        let empty = ChannelRecord {
            channel_point: Some(json!("")),
            ..Default::default()
        };
        assert_eq!(empty.funding_txid(), None);
        assert_eq!(ChannelRecord::default().funding_txid(), None);

        let numeric = ChannelRecord {
            channel_point: Some(json!(12345)),
            ..Default::default()
        };
        assert_eq!(numeric.funding_txid(), None);
    }

    #[test]
    fn test_empty_alias_is_absent() {
        let event = ForwardingEvent {
            peer_alias_in: Some(json!("")),
            peer_alias_out: Some(json!("Bob")),
            fee_msat: None,
        };
        assert_eq!(event.alias_in(), None);
        assert_eq!(event.alias_out(), Some("Bob"));
    }

    #[test]
    fn test_load_channel_snapshot() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"channels": [{{"peer_alias": "Alice", "channel_point": "aa:0", "local_balance": "100000", "capacity": "500000"}}]}}"#
        )?;

        let channels = ChannelSnapshot::load(file.path())?.into_channels(file.path());
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].alias(), Some("Alice"));
        assert_eq!(coerce_amount(channels[0].local_balance.as_ref()), Ok(100000));
        Ok(())
    }

    #[test]
    fn test_mistyped_fields_stay_per_record() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"channels": [{{"peer_alias": "Alice", "local_balance": 1}}, {{"peer_alias": 42, "channel_point": ["aa", 0], "local_balance": null}}]}}"#
        )?;

        let channels = ChannelSnapshot::load(file.path())?.into_channels(file.path());
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].alias(), Some("Alice"));
        assert_eq!(channels[1].alias(), None);
        assert_eq!(channels[1].funding_txid(), None);

        // explicit null is kept so coercion can report it, a missing key is just 0
        assert_eq!(channels[1].local_balance, Some(Value::Null));
        assert!(coerce_amount(channels[1].local_balance.as_ref()).is_err());
        assert_eq!(coerce_amount(ChannelRecord::default().local_balance.as_ref()), Ok(0));
        Ok(())
    }

    #[test]
    fn test_missing_key_reads_as_empty() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"last_offset_index": 0}}"#)?;

        let events = ForwardingSnapshot::load(file.path())?.into_events(file.path());
        assert!(events.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("listChannels");
        assert!(matches!(
            ChannelSnapshot::load(&missing),
            Err(SnapshotError::NotFound(_))
        ));

        let garbage = dir.path().join("fwdingHistory");
        std::fs::write(&garbage, "not json")?;
        assert!(matches!(
            ForwardingSnapshot::load(&garbage),
            Err(SnapshotError::Decode { .. })
        ));

        let wrong_shape = dir.path().join("array");
        std::fs::write(&wrong_shape, "[1, 2, 3]")?;
        assert!(matches!(
            ChannelSnapshot::load(&wrong_shape),
            Err(SnapshotError::Decode { .. })
        ));
        Ok(())
    }
}
