use crate::error::Result;
use std::future::Future;

/// A natural-language search capability that answers with free text.
///
/// `map_grounding` asks the oracle to consult its map-search tool instead of
/// answering from prior knowledge. Transport, auth and quota failures are
/// returned as-is.
pub trait SearchOracle: Send + Sync {
    fn ask(&self, instruction: &str, map_grounding: bool) -> impl Future<Output = Result<String>> + Send;
}
