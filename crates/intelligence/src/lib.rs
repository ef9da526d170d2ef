//! Conversation intelligence: per-turn classification, influence-principle
//! selection, and filler/hedge clip selection.

pub mod analyzer;
pub mod hedge;
pub mod keywords;
pub mod principle;

pub use analyzer::{AnalysisResult, AnalyzerState, ConversationAnalyzer};
pub use hedge::HedgeEngine;
pub use principle::{PrincipleEngine, PrincipleEngineState};
