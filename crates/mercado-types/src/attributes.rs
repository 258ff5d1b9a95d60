//! Per-category listing attributes.
//!
//! Each category kind carries its own attribute shape. Promotion fields are
//! not part of this record; see [`crate::promotion::PromotionState`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::CategoryKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingAttributes {
    Escort(EscortAttributes),
    RealEstate(RealEstateAttributes),
    General(GeneralAttributes),
}

impl Default for ListingAttributes {
    fn default() -> Self {
        Self::General(GeneralAttributes::default())
    }
}

impl ListingAttributes {
    pub fn kind(&self) -> CategoryKind {
        match self {
            Self::Escort(_) => CategoryKind::Escort,
            Self::RealEstate(_) => CategoryKind::RealEstate,
            Self::General(_) => CategoryKind::General,
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            Self::Escort(a) => a.video_url.as_deref(),
            Self::RealEstate(a) => a.video_url.as_deref(),
            Self::General(a) => a.fields.get("video_url").and_then(Value::as_str),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscortAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attends: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_1h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealEstateAttributes {
    /// "Particular" or "Imobiliária"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertiser_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    /// Floor area in square meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl RealEstateAttributes {
    /// Rounded price per square meter, when the area is known and positive.
    pub fn price_per_square_meter(&self, price: f64) -> Option<i64> {
        match self.size {
            Some(size) if size > 0.0 => Some((price / size).round() as i64),
            _ => None,
        }
    }
}

/// Categories without a dedicated shape keep a free-form bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralAttributes {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
