pub mod config;
pub mod finding;
pub mod triage;

pub use config::{Config, LlmConfig, TriageLimits};
pub use finding::{AiAnalysis, Finding, FindingStatus, Severity};
pub use triage::{TriageAction, TriageItem, TriageRequest, TriageResponse};
