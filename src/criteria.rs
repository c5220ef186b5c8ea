//! Resolution of raw, partially optional search input into [`SearchCriteria`].

use crate::error::{LeadError, Result};
use serde::Serialize;

/// Search input as received from the caller, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct LeadRequest {
    pub location: String,
    pub quantity: u32,
    pub min_reviews: Option<u32>,
    pub max_distance: Option<String>,
    pub rating_threshold: f64,
}

/// Fully resolved criteria driving one query.
///
/// `rating_threshold` is an exclusive upper bound (results rate strictly
/// below it); `min_reviews` is inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCriteria {
    pub location: String,
    pub quantity: u32,
    pub min_reviews: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<String>,
    pub rating_threshold: f64,
}

/// Applies defaults and rejects a blank location.
///
/// Quantity and rating threshold pass through untouched; their bounds belong
/// to the input surface.
pub fn normalize(request: &LeadRequest) -> Result<SearchCriteria> {
    let location = request.location.trim();
    if location.is_empty() {
        return Err(LeadError::InvalidInput("Location cannot be empty".into()));
    }

    let max_distance = request.max_distance.as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(SearchCriteria {
        location: location.to_string(),
        quantity: request.quantity,
        min_reviews: request.min_reviews.unwrap_or(0),
        max_distance,
        rating_threshold: request.rating_threshold,
    })
}
