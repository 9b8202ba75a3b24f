//! Administrator-owned analysis configuration
//!
//! At most one configuration is active at a time. When none is active the
//! built-in default from [`AnalysisConfiguration::builtin_default`] is used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::analysis::ProductCategory;

pub const DEFAULT_SYSTEM_ROLE: &str = "You are an expert international trade compliance analyst \
specializing in customs classification, tariff schedules, and cross-border import regulations.";

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MAX_TOKENS_LIMIT: u32 = 32_000;

const DEFAULT_FOCUS_AREAS: [&str; 6] = [
    "Harmonized System (HS) code classification",
    "Import duties and tariff rates",
    "Import restrictions and prohibitions",
    "Required documentation and certificates",
    "Product safety and labeling standards",
    "Free trade agreement eligibility",
];

const DEFAULT_CATEGORY_INSTRUCTIONS: [(ProductCategory, &str); 6] = [
    (
        ProductCategory::Electronics,
        "Check electrical safety certifications, electromagnetic compatibility rules, battery \
         transport restrictions, and e-waste obligations.",
    ),
    (
        ProductCategory::TextilesApparel,
        "Check fiber content labeling, country-of-origin marking, and textile quota or \
         anti-dumping measures.",
    ),
    (
        ProductCategory::FoodBeverages,
        "Check sanitary and phytosanitary requirements, food facility registration, labeling \
         and allergen rules, and import permits.",
    ),
    (
        ProductCategory::Cosmetics,
        "Check ingredient restrictions, product notification or registration, and labeling \
         requirements.",
    ),
    (
        ProductCategory::ToysGames,
        "Check toy safety standards, age grading, small-parts and chemical content limits.",
    ),
    (
        ProductCategory::Other,
        "Identify the most specific applicable classification and any general import \
         controls for the product.",
    ),
];

/// How deep the requested assessment should go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Basic,
    Detailed,
    Comprehensive,
}

/// Desired response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
    Text,
    Structured,
}

/// Administrator's declared preference for endpoint failures
///
/// Stored and returned with the configuration only. The pipeline always makes
/// a single call and marks the record failed when it errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackBehavior {
    Retry,
    Simplify,
    Error,
}

macro_rules! text_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

text_enum!(AnalysisDepth { Basic => "basic", Detailed => "detailed", Comprehensive => "comprehensive" });
text_enum!(ResponseFormat { Json => "json", Text => "text", Structured => "structured" });
text_enum!(FallbackBehavior { Retry => "retry", Simplify => "simplify", Error => "error" });

/// Persisted analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfiguration {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub system_role: String,
    pub analysis_depth: AnalysisDepth,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Category display name → extra instruction text
    pub category_instructions: BTreeMap<String, String>,
    pub focus_areas: Vec<String>,
    pub custom_instructions: Option<String>,
    pub response_format: ResponseFormat,
    /// Advisory only, rendered into the prompt but not enforced
    pub validation_rules: Vec<String>,
    pub fallback_behavior: FallbackBehavior,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl AnalysisConfiguration {
    /// Hard-coded configuration used when no configuration is active
    pub fn builtin_default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            name: "Built-in default".to_string(),
            description: Some("Used when no configuration is active".to_string()),
            is_active: false,
            system_role: DEFAULT_SYSTEM_ROLE.to_string(),
            analysis_depth: AnalysisDepth::Detailed,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            category_instructions: DEFAULT_CATEGORY_INSTRUCTIONS
                .iter()
                .map(|(category, text)| (category.as_str().to_string(), text.to_string()))
                .collect(),
            focus_areas: DEFAULT_FOCUS_AREAS.iter().map(|s| s.to_string()).collect(),
            custom_instructions: None,
            response_format: ResponseFormat::Json,
            validation_rules: Vec::new(),
            fallback_behavior: FallbackBehavior::Retry,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Create a new inactive configuration from an administrator draft
    pub fn from_draft(draft: ConfigurationDraft, created_by: Option<String>) -> Self {
        let now = Utc::now();
        let mut config = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            description: None,
            is_active: false,
            system_role: String::new(),
            analysis_depth: AnalysisDepth::Detailed,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            category_instructions: BTreeMap::new(),
            focus_areas: Vec::new(),
            custom_instructions: None,
            response_format: ResponseFormat::Json,
            validation_rules: Vec::new(),
            fallback_behavior: FallbackBehavior::Retry,
            created_at: now,
            updated_at: now,
            created_by,
        };
        config.apply_draft(draft);
        config
    }

    /// Overwrite the editable fields, keeping identity, activation and creation data
    pub fn apply_draft(&mut self, draft: ConfigurationDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.system_role = draft.system_role;
        self.analysis_depth = draft.analysis_depth;
        self.temperature = draft.temperature;
        self.max_tokens = draft.max_tokens;
        self.category_instructions = draft.category_instructions;
        self.focus_areas = draft.focus_areas;
        self.custom_instructions = draft.custom_instructions;
        self.response_format = draft.response_format;
        self.validation_rules = draft.validation_rules;
        self.fallback_behavior = draft.fallback_behavior;
        self.updated_at = Utc::now();
    }

    /// Instruction for a category, falling back to the "Other" instruction
    pub fn category_instruction(&self, category: Option<ProductCategory>) -> Option<&str> {
        category
            .and_then(|c| self.category_instructions.get(c.as_str()))
            .or_else(|| self.category_instructions.get(ProductCategory::Other.as_str()))
            .map(String::as_str)
    }
}

/// Editable configuration fields, as submitted by an administrator
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_system_role")]
    pub system_role: String,
    #[serde(default = "default_depth")]
    pub analysis_depth: AnalysisDepth,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub category_instructions: BTreeMap<String, String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default = "default_response_format")]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub validation_rules: Vec<String>,
    #[serde(default = "default_fallback")]
    pub fallback_behavior: FallbackBehavior,
}

fn default_system_role() -> String {
    DEFAULT_SYSTEM_ROLE.to_string()
}

fn default_depth() -> AnalysisDepth {
    AnalysisDepth::Detailed
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_response_format() -> ResponseFormat {
    ResponseFormat::Json
}

fn default_fallback() -> FallbackBehavior {
    FallbackBehavior::Retry
}

impl ConfigurationDraft {
    /// Reject drafts that would produce an unusable endpoint request
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Configuration name cannot be empty".to_string());
        }
        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0 and {}, got {}",
                MAX_TEMPERATURE, self.temperature
            ));
        }
        if self.max_tokens == 0 || self.max_tokens > MAX_TOKENS_LIMIT {
            return Err(format!(
                "max_tokens must be between 1 and {}, got {}",
                MAX_TOKENS_LIMIT, self.max_tokens
            ));
        }
        Ok(())
    }
}
