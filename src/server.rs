use crate::config::Config;
use crate::criteria::LeadRequest;
use crate::error::LeadError;
use crate::export;
use crate::leads::{GeminiClient, LeadBatch, LeadPipeline};
use crate::tools::{ExportLeadsParams, FindLeadsParams, GetConfigInfoParams, SwitchModelParams};

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use std::path::PathBuf;

const NO_RESULTS_ADVISORY: &str =
    "No businesses found matching these strict criteria. Try increasing the max rating or changing the location.";

#[derive(Clone)]
pub struct LeadFinderServer {
    pub config: Config,
    pub pipeline: LeadPipeline<GeminiClient>,
}

impl LeadFinderServer {
    pub fn new(config: Config) -> crate::error::Result<Self> {
        let client = GeminiClient::new(&config)?;
        let pipeline = LeadPipeline::new(client).with_map_grounding(config.map_grounding);
        Ok(Self { config, pipeline })
    }
}

#[tool_router]
impl LeadFinderServer {
    #[tool(description = r#"
    Searches Google Maps (through a map-grounded Gemini model) for small local businesses
    that are rated below a threshold and ideally have no website, and returns them as JSON.

    The `location` is the target area, e.g. "Downtown Los Angeles" or "NY 10001". Required.
    The `quantity` is the number of leads to look for (1-50). It is a goal, not a guarantee.
    The `min_reviews` is the minimum review count (inclusive, default 0).
    The `max_distance` is an optional radius such as "5 miles".
    The `rating_threshold` is an exclusive ceiling: businesses must be rated strictly below it.

    Returns
    -------
    str
        A JSON-encoded object with `status`, `count`, `discarded` (entries dropped as malformed),
        `leads` (companyName, rating, reviewCount, phoneNumber, address, postalCode, googleMapsUrl)
        and, when nothing matched, an advisory `message`.
    "#)]
    pub async fn find_leads(&self, Parameters(params): Parameters<FindLeadsParams>) -> std::result::Result<String, McpError> {
        params.validate().map_err(|msg| McpError::invalid_params(msg, None))?;
        let request = LeadRequest::from(params);

        let batch = self.pipeline.search(&request).await.map_err(to_mcp_error)?;
        serde_json::to_string_pretty(&search_payload(&batch)).map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    #[tool(description = r#"
    Exports leads returned by `find_leads` to a CSV file named leads_YYYY-MM-DD.csv.

    Columns: Company Name, Rating, Reviews, Phone, Address, Postal Code, Maps URL.
    The file is written to `directory` when given, otherwise to the configured export directory.

    Returns: JSON with `status`, `path` and `rows`
    "#)]
    pub async fn export_leads_csv(&self, Parameters(params): Parameters<ExportLeadsParams>) -> std::result::Result<String, McpError> {
        params.validate().map_err(|msg| McpError::invalid_params(msg, None))?;

        let dir = params.directory.as_deref()
            .map(|d| PathBuf::from(d.trim()))
            .unwrap_or_else(|| self.config.export_dir.clone());
        let path = export::write_csv(&dir, &params.leads).map_err(to_mcp_error)?;

        let payload = serde_json::json!({
            "status": "success",
            "path": path.to_string_lossy(),
            "rows": params.leads.len(),
        });
        serde_json::to_string_pretty(&payload).map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    #[tool(description = r#"
    Returns the current lead finder configuration and tests the connection to the search API.

    This tool is useful for:
    - Verifying that environment variables are correctly configured
    - Testing API connectivity by listing the available models
    - Checking the current model, grounding and export settings

    Returns
    -------
    str
        A JSON-encoded string containing:
        - `api_url`, `api_key` (masked), `model`, `map_grounding`, `request_timeout`
        - `export_dir`, `debug_enabled`, `log_level`, `config_file`
        - `connection_test`: status, message, response_time_ms, model_count
    "#)]
    pub async fn get_config_info(&self, _params: Parameters<GetConfigInfoParams>) -> std::result::Result<String, McpError> {
        let connection_test = self.pipeline.oracle().test_connection().await;

        let payload = serde_json::json!({
            "api_url": &self.config.api_url,
            "api_key": self.config.mask_api_key(),
            "model": &self.config.model,
            "map_grounding": self.config.map_grounding,
            "request_timeout": self.config.request_timeout,
            "export_dir": self.config.export_dir.to_string_lossy(),
            "debug_enabled": self.config.debug_enabled,
            "log_level": &self.config.log_level,
            "config_file": Config::config_file_path().to_string_lossy(),
            "connection_test": connection_test,
        });

        serde_json::to_string_pretty(&payload).map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    #[tool(description = r#"
    Switches the Gemini model used for lead searches and persists the setting.
    The new model is used after the server restarts.

    Parameters
    ----------
    model : str
        The model ID to switch to (e.g., "gemini-2.5-flash", "gemini-2.5-pro")

    Returns
    -------
    str
        A JSON-encoded string with `status`, `previous_model`, `current_model`,
        `message` and `config_file`
    "#)]
    pub async fn switch_model(&self, Parameters(params): Parameters<SwitchModelParams>) -> std::result::Result<String, McpError> {
        params.validate().map_err(|msg| McpError::invalid_params(msg, None))?;

        let previous = self.config.model.clone();
        let next = params.model.trim().to_string();

        let payload = match Config::save_model(&next) {
            Ok(()) => serde_json::json!({
                "status": "success",
                "previous_model": previous,
                "current_model": next,
                "message": format!("Model switched from {} to {}; restart the server to apply", previous, next),
                "config_file": Config::config_file_path().to_string_lossy(),
            }),
            Err(e) => serde_json::json!({
                "status": "error",
                "message": format!("Failed to switch model: {}", e),
            }),
        };

        serde_json::to_string_pretty(&payload).map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_handler(router = Self::tool_router())]
impl ServerHandler for LeadFinderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "maps-lead-finder".into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn search_payload(batch: &LeadBatch) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "status": "success",
        "count": batch.len(),
        "discarded": batch.discarded,
        "leads": &batch.leads,
    });
    if batch.is_empty() {
        payload["message"] = NO_RESULTS_ADVISORY.into();
    }
    payload
}

fn to_mcp_error(e: LeadError) -> McpError {
    if e.is_invalid_input() {
        McpError::invalid_params(e.to_string(), None)
    } else {
        McpError::internal_error(e.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::BusinessLead;
    use rmcp::model::ErrorCode;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, export_dir: PathBuf) -> Config {
        Config {
            api_url: base_url.into(),
            api_key: "test-key".into(),
            model: "gemini-test".into(),
            map_grounding: true,
            request_timeout: 30,
            export_dir,
            debug_enabled: false,
            log_level: "INFO".into(),
        }
    }

    fn sse_reply(text: &str) -> String {
        let event = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        });
        format!("data: {event}\n\n")
    }

    fn find_params(location: &str) -> FindLeadsParams {
        serde_json::from_value(serde_json::json!({ "location": location })).unwrap()
    }

    #[tokio::test]
    async fn find_leads_returns_leads_json() {
        let server = MockServer::start().await;
        let reply = "```json\n[{\"companyName\":\"Acme\",\"rating\":3.2,\"reviewCount\":12,\"phoneNumber\":\"N/A\",\"address\":\"1 Main St\",\"postalCode\":\"90001\",\"googleMapsUrl\":\"https://maps.example/acme\"}]\n```";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_reply(reply), "text/event-stream"))
            .mount(&server)
            .await;

        let app = LeadFinderServer::new(test_config(&server.uri(), PathBuf::from("."))).unwrap();
        let out = app.find_leads(Parameters(find_params("Los Angeles"))).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["count"], 1);
        assert_eq!(json["leads"][0]["companyName"], "Acme");
        assert!(json.get("message").is_none());
    }

    #[tokio::test]
    async fn empty_result_carries_advisory() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_reply("[]"), "text/event-stream"))
            .mount(&server)
            .await;

        let app = LeadFinderServer::new(test_config(&server.uri(), PathBuf::from("."))).unwrap();
        let out = app.find_leads(Parameters(find_params("Nowhere"))).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["count"], 0);
        assert_eq!(json["message"], NO_RESULTS_ADVISORY);
    }

    #[tokio::test]
    async fn blank_location_is_invalid_params_without_api_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = LeadFinderServer::new(test_config(&server.uri(), PathBuf::from("."))).unwrap();
        let err = app.find_leads(Parameters(find_params("   "))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unparseable_reply_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_reply("No luck, sorry."), "text/event-stream"))
            .mount(&server)
            .await;

        let app = LeadFinderServer::new(test_config(&server.uri(), PathBuf::from("."))).unwrap();
        let err = app.find_leads(Parameters(find_params("Boise"))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("Could not parse leads"), "{}", err.message);
    }

    #[tokio::test]
    async fn export_writes_into_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let app = LeadFinderServer::new(test_config("http://127.0.0.1:9", dir.path().to_path_buf())).unwrap();
        let lead = BusinessLead {
            company_name: "Acme".into(),
            rating: 3.2,
            review_count: 12,
            phone_number: "N/A".into(),
            address: "1 Main St".into(),
            postal_code: "90001".into(),
            google_maps_url: String::new(),
            website: None,
        };

        let params = ExportLeadsParams { leads: vec![lead], directory: None };
        let out = app.export_leads_csv(Parameters(params)).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["rows"], 1);
        let path = PathBuf::from(json["path"].as_str().unwrap());
        assert!(path.starts_with(dir.path()));
        assert!(std::fs::read_to_string(path).unwrap().contains("\"Acme\",3.2,12"));
    }

    #[tokio::test]
    async fn export_rejects_empty_lead_list() {
        let app = LeadFinderServer::new(test_config("http://127.0.0.1:9", PathBuf::from("."))).unwrap();
        let params = ExportLeadsParams { leads: Vec::new(), directory: None };
        let err = app.export_leads_csv(Parameters(params)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
