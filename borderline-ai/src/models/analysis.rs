//! Analysis submission, result and persisted record
//!
//! A record moves through `pending → processing → {completed | failed}` and is
//! never mutated after reaching a terminal status.

use borderline_common::AnalysisStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phrase used for every list of the manual-review placeholder
pub const MANUAL_REVIEW_REQUIRED: &str = "Manual review required";

/// Value substituted for an unknown tariff code or processing time
pub const UNKNOWN: &str = "Unknown";

/// Fixed product category catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Electronics,
    #[serde(rename = "Textiles & Apparel")]
    TextilesApparel,
    #[serde(rename = "Food & Beverages")]
    FoodBeverages,
    Machinery,
    Chemicals,
    Cosmetics,
    #[serde(rename = "Toys & Games")]
    ToysGames,
    #[serde(rename = "Automotive Parts")]
    AutomotiveParts,
    #[serde(rename = "Medical Devices")]
    MedicalDevices,
    Furniture,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 11] = [
        ProductCategory::Electronics,
        ProductCategory::TextilesApparel,
        ProductCategory::FoodBeverages,
        ProductCategory::Machinery,
        ProductCategory::Chemicals,
        ProductCategory::Cosmetics,
        ProductCategory::ToysGames,
        ProductCategory::AutomotiveParts,
        ProductCategory::MedicalDevices,
        ProductCategory::Furniture,
        ProductCategory::Other,
    ];

    /// Display name, also the key used in configuration category instructions
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Electronics => "Electronics",
            ProductCategory::TextilesApparel => "Textiles & Apparel",
            ProductCategory::FoodBeverages => "Food & Beverages",
            ProductCategory::Machinery => "Machinery",
            ProductCategory::Chemicals => "Chemicals",
            ProductCategory::Cosmetics => "Cosmetics",
            ProductCategory::ToysGames => "Toys & Games",
            ProductCategory::AutomotiveParts => "Automotive Parts",
            ProductCategory::MedicalDevices => "Medical Devices",
            ProductCategory::Furniture => "Furniture",
            ProductCategory::Other => "Other",
        }
    }

    /// Parse a catalog name (case-insensitive, surrounding whitespace ignored)
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uploaded product image, not yet validated
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Image persisted in the object store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
    pub path: String,
    pub url: String,
}

/// User submission (ephemeral)
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub product_name: String,
    pub product_description: String,
    pub product_category: Option<ProductCategory>,
    pub origin_country: String,
    pub destination_country: String,
    pub image: Option<ProductImage>,
}

/// Structured compliance assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub hs_code: String,
    pub tariff_rate: f64,
    pub requirements: Vec<String>,
    pub restrictions: Vec<String>,
    pub documentation: Vec<String>,
    pub estimated_processing_time: String,
    /// Always within [0, 1]
    pub confidence: f64,
    pub analysis_text: String,
}

impl AnalysisResult {
    /// Placeholder stored when the reply has no usable structured content
    pub fn manual_review(raw_reply: &str) -> Self {
        let review = vec![MANUAL_REVIEW_REQUIRED.to_string()];
        Self {
            hs_code: UNKNOWN.to_string(),
            tariff_rate: 0.0,
            requirements: review.clone(),
            restrictions: review.clone(),
            documentation: review,
            estimated_processing_time: UNKNOWN.to_string(),
            confidence: 0.0,
            analysis_text: raw_reply.to_string(),
        }
    }

    pub fn is_manual_review(&self) -> bool {
        let review = [MANUAL_REVIEW_REQUIRED.to_string()];
        self.hs_code == UNKNOWN
            && self.confidence == 0.0
            && self.requirements == review
            && self.restrictions == review
            && self.documentation == review
    }
}

/// Persisted analysis record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: String,
    pub product_name: String,
    pub product_description: String,
    pub product_category: Option<ProductCategory>,
    pub origin_country: String,
    pub destination_country: String,
    pub status: AnalysisStatus,
    /// Present if and only if `status == Completed`
    pub result: Option<AnalysisResult>,
    /// Failure note, present only when `status == Failed`
    pub diagnostic: Option<String>,
    pub image: Option<StoredImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisRecord {
    /// New pending record for a submission
    pub fn new(user_id: &str, request: &AnalysisRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            product_name: request.product_name.clone(),
            product_description: request.product_description.clone(),
            product_category: request.product_category,
            origin_country: request.origin_country.clone(),
            destination_country: request.destination_country.clone(),
            status: AnalysisStatus::Pending,
            result: None,
            diagnostic: None,
            image: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}
