use serde::{Deserialize, Serialize};

use crate::channel::ByteOrder;

pub const LIST_SEPARATOR: char = ';';

/// What to do with a channel type tag that is not one of the four known tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypePolicy {
    /// Reject the configuration.
    #[default]
    Strict,
    /// Log a warning and decode the channel as `float`.
    Lenient,
}

/// Channel configuration as it arrives from the command line or a file.
///
/// Gains and offsets are kept as strings: an empty list means "defaults for
/// every channel", and entries that do not parse keep the default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub names: Vec<String>,
    pub types: Vec<String>,
    #[serde(default)]
    pub gains: Vec<String>,
    #[serde(default)]
    pub offsets: Vec<String>,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub type_policy: TypePolicy,
}

impl LayoutConfig {
    /// Build a configuration from semicolon-joined lists.
    ///
    /// # Examples
    /// ```
    /// use replayamp_core::LayoutConfig;
    ///
    /// let config = LayoutConfig::from_joined("Fp1;Fp2", "float;float", "", "");
    /// assert_eq!(config.names, vec!["Fp1", "Fp2"]);
    /// assert!(config.gains.is_empty());
    /// ```
    pub fn from_joined(names: &str, types: &str, gains: &str, offsets: &str) -> Self {
        Self {
            names: split_list(names),
            types: split_list(types),
            gains: split_list(gains),
            offsets: split_list(offsets),
            ..Self::default()
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_type_policy(mut self, type_policy: TypePolicy) -> Self {
        self.type_policy = type_policy;
        self
    }
}

/// Split a semicolon-joined list, trimming each entry.
///
/// A blank input yields an empty list; inner empty entries are kept so that
/// count checks still see them.
pub fn split_list(joined: &str) -> Vec<String> {
    if joined.trim().is_empty() {
        return Vec::new();
    }
    joined
        .split(LIST_SEPARATOR)
        .map(|entry| entry.trim().to_string())
        .collect()
}

/// Parse a gain or offset entry, keeping `default` when it is not a number.
pub(crate) fn parse_scale(entry: &str, default: f64, channel: &str, what: &str) -> f64 {
    match entry.trim().parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(
                channel,
                entry,
                default,
                "unparsable channel {what}, keeping default"
            );
            default
        }
    }
}
