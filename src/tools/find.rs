use crate::criteria::LeadRequest;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindLeadsParams {
    /// Target area, e.g. "Downtown Los Angeles" or "NY 10001"
    pub location: String,

    /// Number of leads to look for (1-50, default 10)
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Minimum number of reviews a business must have (default 0)
    #[serde(default)]
    pub min_reviews: Option<u32>,

    /// Search radius, e.g. "5 miles" (omit for no limit)
    #[serde(default)]
    pub max_distance: Option<String>,

    /// Businesses must be rated strictly below this value (1.0-5.0, default 4.0)
    #[serde(default = "default_rating_threshold")]
    pub rating_threshold: f64,
}

fn default_quantity() -> u32 { 10 }
fn default_rating_threshold() -> f64 { 4.0 }

impl FindLeadsParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.location.chars().count() > 500 {
            return Err("Location exceeds 500 characters".into());
        }
        if !(1..=50).contains(&self.quantity) {
            return Err("quantity must be between 1 and 50".into());
        }
        if !self.rating_threshold.is_finite() || !(1.0..=5.0).contains(&self.rating_threshold) {
            return Err("rating_threshold must be between 1.0 and 5.0".into());
        }
        if self.max_distance.as_deref().is_some_and(|d| d.chars().count() > 100) {
            return Err("max_distance exceeds 100 characters".into());
        }
        Ok(())
    }
}

impl From<FindLeadsParams> for LeadRequest {
    fn from(params: FindLeadsParams) -> Self {
        Self {
            location: params.location,
            quantity: params.quantity,
            min_reviews: params.min_reviews,
            max_distance: params.max_distance,
            rating_threshold: params.rating_threshold,
        }
    }
}
