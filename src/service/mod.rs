pub mod clock;
pub mod llm;
pub mod rate_limit;
pub mod scoring;
pub mod store;
pub mod triage;

pub use clock::SystemClock;
pub use llm::HttpModelClient;
pub use triage::{TriageError, TriageService};
