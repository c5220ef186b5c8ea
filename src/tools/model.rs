use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwitchModelParams {
    /// Gemini model to switch to (e.g., "gemini-2.5-flash", "gemini-2.5-pro")
    pub model: String,
}

impl SwitchModelParams {
    pub fn validate(&self) -> Result<(), String> {
        let model = self.model.trim();
        if model.is_empty() {
            return Err("Model name cannot be empty".into());
        }
        if model.len() > 100 {
            return Err("Model name exceeds 100 characters".into());
        }
        if model.trim_start_matches("models/").contains(['/', '?', '#']) {
            return Err("Model name must not contain URL separators".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(model: &str) -> Result<(), String> {
        SwitchModelParams { model: model.into() }.validate()
    }

    #[test]
    fn accepts_plain_and_prefixed_names() {
        assert!(check("gemini-2.5-pro").is_ok());
        assert!(check("models/gemini-2.5-flash").is_ok());
    }

    #[test]
    fn rejects_blank_and_path_like_names() {
        assert!(check("  ").is_err());
        assert!(check("gemini/../../admin").is_err());
        assert!(check("gemini?alt=json").is_err());
    }
}
