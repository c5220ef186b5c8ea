use crate::leads::BusinessLead;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportLeadsParams {
    /// Leads as returned by `find_leads`
    pub leads: Vec<BusinessLead>,

    /// Directory to write into (defaults to LEADS_EXPORT_DIR)
    #[serde(default)]
    pub directory: Option<String>,
}

impl ExportLeadsParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.leads.is_empty() {
            return Err("No leads to export".into());
        }
        if self.directory.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err("directory cannot be blank".into());
        }
        Ok(())
    }
}
