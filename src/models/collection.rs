use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Card id -> owned copies. A missing key means zero.
pub type OwnedQuantityMap = HashMap<String, u32>;

/// Read an owned-quantity map out of a raw collection document.
///
/// Negative and fractional values are clamped/truncated; non-numeric values
/// are dropped.
pub fn owned_from_document(data: &Map<String, Value>) -> OwnedQuantityMap {
    data.iter()
        .filter_map(|(card_id, value)| {
            let qty = if let Some(n) = value.as_u64() {
                u32::try_from(n).unwrap_or(u32::MAX)
            } else if value.is_i64() {
                // negative
                0
            } else {
                let f = value.as_f64()?;
                if f.is_finite() && f > 0.0 {
                    f.min(u32::MAX as f64) as u32
                } else {
                    0
                }
            };
            Some((card_id.clone(), qty))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ExpansionStats -- Per-set completion, derived and never stored
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionStats {
    pub set_id: String,
    pub set_name: String,
    pub total_cards: u32,
    pub unique_owned: u32,
    pub total_copies_owned: u64,
}

impl ExpansionStats {
    /// `unique_owned / total_cards`, or `0.0` for an empty set.
    pub fn completion_ratio(&self) -> f64 {
        if self.total_cards == 0 {
            0.0
        } else {
            f64::from(self.unique_owned) / f64::from(self.total_cards)
        }
    }

    /// Completion as a whole percentage, rounded down.
    pub fn completion_percent(&self) -> u32 {
        (self.completion_ratio() * 100.0).floor() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.total_cards > 0 && self.unique_owned >= self.total_cards
    }
}

// ---------------------------------------------------------------------------
// UserProfile -- `users/{userId}`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub friends: Vec<String>,
}

impl UserProfile {
    /// Profile used for a user who has not been provisioned yet:
    /// `User-` followed by the first eight characters of the id.
    pub fn placeholder(user_id: &str) -> Self {
        let short: String = user_id.chars().take(8).collect();
        Self {
            display_name: format!("User-{short}"),
            email: None,
            friends: Vec::new(),
        }
    }
}
