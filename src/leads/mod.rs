mod client;
mod extract;
mod oracle;
mod pipeline;
mod prompt;
mod types;

pub use client::GeminiClient;
pub use oracle::SearchOracle;
pub use pipeline::LeadPipeline;
pub use types::{BusinessLead, LeadBatch};
