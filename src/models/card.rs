use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Card -- A single printing, always annotated with its owning set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub local_number: String,
    pub image_base_url: Option<String>,
    pub set_id: String,
    pub set_name: String,
}

/// Resolution of a TCGdex card image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageQuality {
    Low,
    High,
}

impl ImageQuality {
    fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

impl Card {
    /// Full asset URL, e.g. `<image_base_url>/high.webp`.
    ///
    /// Returns `None` for cards the API ships without artwork.
    pub fn image_url(&self, quality: ImageQuality, extension: &str) -> Option<String> {
        self.image_base_url
            .as_deref()
            .map(|base| format!("{}/{}.{}", base.trim_end_matches('/'), quality.as_str(), extension))
    }
}

/// Card entry as it appears inside `GET /sets/{setId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub local_id: serde_json::Value,
    pub image: Option<String>,
}

impl RawCard {
    /// Attach the owning set. `localId` is a string upstream but some older
    /// sets serialize it as a number.
    pub fn into_card(self, set_id: &str, set_name: &str) -> Card {
        let local_number = match self.local_id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        Card {
            id: self.id,
            name: self.name,
            local_number,
            image_base_url: self.image.filter(|s| !s.is_empty()),
            set_id: set_id.to_string(),
            set_name: set_name.to_string(),
        }
    }
}
