use super::extract::extract_leads;
use super::oracle::SearchOracle;
use super::prompt::build_instruction;
use super::types::LeadBatch;
use crate::criteria::{self, LeadRequest, SearchCriteria};
use crate::error::{LeadError, Result};
use tracing::{debug, info};

/// Criteria in, validated leads out.
///
/// Holds no mutable state; every call is independent. Failures from the
/// oracle or from extraction surface immediately without retry.
#[derive(Debug, Clone)]
pub struct LeadPipeline<O> {
    oracle: O,
    map_grounding: bool,
}

impl<O: SearchOracle> LeadPipeline<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle, map_grounding: true }
    }

    pub fn with_map_grounding(mut self, enabled: bool) -> Self {
        self.map_grounding = enabled;
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Normalizes raw input, then runs the search.
    pub async fn search(&self, request: &LeadRequest) -> Result<LeadBatch> {
        let criteria = criteria::normalize(request)?;
        self.find_leads(&criteria).await
    }

    pub async fn find_leads(&self, criteria: &SearchCriteria) -> Result<LeadBatch> {
        if criteria.location.trim().is_empty() {
            return Err(LeadError::InvalidInput("Location cannot be empty".into()));
        }

        info!("Searching for {} leads in {:?}", criteria.quantity, criteria.location);
        let instruction = build_instruction(criteria);
        let reply = self.oracle.ask(&instruction, self.map_grounding).await?;
        debug!("Oracle replied with {} bytes", reply.len());

        let batch = extract_leads(&reply)?;
        let with_website = batch.leads.iter().filter(|l| l.website.is_some()).count();
        if with_website > 0 {
            debug!("{} of {} leads list a website", with_website, batch.len());
        }
        info!("Found {} leads ({} entries discarded)", batch.len(), batch.discarded);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a canned reply and records every instruction it receives.
    struct FakeOracle {
        reply: std::result::Result<String, String>,
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl FakeOracle {
        fn replying(text: &str) -> Self {
            Self { reply: Ok(text.into()), calls: Mutex::new(Vec::new()) }
        }

        fn failing(message: &str) -> Self {
            Self { reply: Err(message.into()), calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<(String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SearchOracle for FakeOracle {
        async fn ask(&self, instruction: &str, map_grounding: bool) -> Result<String> {
            self.calls.lock().unwrap().push((instruction.to_string(), map_grounding));
            self.reply.clone().map_err(|message| LeadError::Api { status: 429, message })
        }
    }

    fn request(location: &str) -> LeadRequest {
        LeadRequest {
            location: location.into(),
            quantity: 10,
            min_reviews: Some(5),
            max_distance: None,
            rating_threshold: 4.0,
        }
    }

    const ACME_PROSE: &str = "Here are the results: [{\"companyName\":\"Acme\",\"rating\":3.2,\"reviewCount\":12,\"phoneNumber\":\"N/A\",\"address\":\"1 Main St\",\"postalCode\":\"90001\",\"googleMapsUrl\":\"https://maps.example/acme\"}] Hope this helps!";

    #[tokio::test]
    async fn empty_location_never_reaches_oracle() {
        let pipeline = LeadPipeline::new(FakeOracle::replying("[]"));

        let err = pipeline.search(&request("  ")).await.unwrap_err();
        assert!(err.is_invalid_input());
        assert!(pipeline.oracle().calls().is_empty());
    }

    #[tokio::test]
    async fn find_leads_rejects_blank_location_directly() {
        let pipeline = LeadPipeline::new(FakeOracle::replying("[]"));
        let criteria = SearchCriteria {
            location: String::new(),
            quantity: 3,
            min_reviews: 0,
            max_distance: None,
            rating_threshold: 4.0,
        };

        assert!(pipeline.find_leads(&criteria).await.unwrap_err().is_invalid_input());
        assert!(pipeline.oracle().calls().is_empty());
    }

    #[tokio::test]
    async fn empty_array_is_success() {
        let pipeline = LeadPipeline::new(FakeOracle::replying("[]"));
        let batch = pipeline.search(&request("Fresno, CA")).await.expect("[] is a successful search");
        assert!(batch.is_empty());
        assert_eq!(pipeline.oracle().calls().len(), 1);
    }

    #[tokio::test]
    async fn blank_reply_is_an_empty_success() {
        let pipeline = LeadPipeline::new(FakeOracle::replying(""));
        let batch = pipeline.search(&request("Fresno, CA")).await.expect("no text means no matches");
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn prose_reply_yields_acme() {
        let pipeline = LeadPipeline::new(FakeOracle::replying(ACME_PROSE));
        let batch = pipeline.search(&request("Los Angeles")).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.leads[0].company_name, "Acme");
    }

    #[tokio::test]
    async fn unparseable_reply_is_an_error_not_empty() {
        let pipeline = LeadPipeline::new(FakeOracle::replying("I couldn't find anything useful."));
        let err = pipeline.search(&request("Boise")).await.unwrap_err();
        assert!(matches!(err, LeadError::UnparseableResponse { .. }));
    }

    #[tokio::test]
    async fn oracle_failure_passes_through_once() {
        let pipeline = LeadPipeline::new(FakeOracle::failing("quota exceeded"));
        match pipeline.search(&request("Boise")).await.unwrap_err() {
            LeadError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pipeline.oracle().calls().len(), 1);
    }

    #[tokio::test]
    async fn instruction_carries_normalized_criteria() {
        let pipeline = LeadPipeline::new(FakeOracle::replying("[]"));
        let mut req = request(" Portland, OR ");
        req.quantity = 73;
        req.max_distance = Some("3 km".into());
        req.rating_threshold = 3.5;
        pipeline.search(&req).await.unwrap();

        let calls = pipeline.oracle().calls();
        let (instruction, grounding) = &calls[0];
        assert!(*grounding);
        assert!(instruction.contains("within \"Portland, OR\" (Radius: approx 3 km)"));
        assert!(instruction.contains("Try to find 73 businesses"));
        assert!(instruction.contains("strictly BELOW 3.5 stars"));
        assert!(instruction.contains("At least 5 reviews"));
    }

    #[tokio::test]
    async fn grounding_can_be_disabled() {
        let pipeline = LeadPipeline::new(FakeOracle::replying("[]")).with_map_grounding(false);
        pipeline.search(&request("Boise")).await.unwrap();
        assert!(!pipeline.oracle().calls()[0].1);
    }

    #[tokio::test]
    async fn leads_with_website_are_kept() {
        let reply = r#"[{"companyName":"Site Co","rating":2.1,"reviewCount":9,"address":"7 Pine Rd","website":"https://site.example"}]"#;
        let pipeline = LeadPipeline::new(FakeOracle::replying(reply));
        let batch = pipeline.search(&request("Boise")).await.unwrap();
        assert_eq!(batch.leads[0].website.as_deref(), Some("https://site.example"));
    }
}
