use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One business returned by the search oracle, after boundary validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessLead {
    pub company_name: String,
    pub rating: f64,
    pub review_count: u64,
    #[serde(default)]
    pub phone_number: String,
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub google_maps_url: String,
    /// Present only when the oracle reported one; absence is the target case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Successful pipeline outcome. An empty `leads` list is still a success.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadBatch {
    pub leads: Vec<BusinessLead>,
    /// Array entries dropped by validation.
    pub discarded: usize,
}

impl LeadBatch {
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }
}
