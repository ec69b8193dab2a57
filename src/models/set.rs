use serde::{Deserialize, Serialize};

use super::card::RawCard;

// ---------------------------------------------------------------------------
// Set -- One expansion in the catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    pub id: String,
    pub name: String,
    pub total_card_count: u32,
}

// ---------------------------------------------------------------------------
// Wire shapes returned by the TCGdex API
// ---------------------------------------------------------------------------

/// Body of `GET /series/{seriesId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSeries {
    pub sets: Option<Vec<RawSetSummary>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSetSummary {
    pub id: String,
    pub name: String,
    pub card_count: Option<RawCardCount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCardCount {
    pub official: Option<u32>,
}

/// Body of `GET /sets/{setId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSetDetail {
    pub id: String,
    pub name: String,
    pub cards: Option<Vec<RawCard>>,
}

impl From<RawSetSummary> for Set {
    fn from(raw: RawSetSummary) -> Self {
        let total_card_count = raw
            .card_count
            .and_then(|c| c.official)
            .unwrap_or(0);
        Self {
            id: raw.id,
            name: raw.name,
            total_card_count,
        }
    }
}
