//! Analysis of a single file record by a remote text-generation service.
//!
//! The prompt is built from the record, sent as one chat-completions request,
//! and the first `content` value of the response is shown to the user. Every
//! failure is folded into a readable message.

pub mod client;
pub mod dispatch;
pub mod prompt;

pub use client::{AnalysisClient, AnalysisClientConfig, AnalysisOutcome};
pub use dispatch::{AnalysisDispatcher, AnalysisEvent, InFlight, RequestId};
pub use prompt::{build_prompt, escape_json, extract_content};
