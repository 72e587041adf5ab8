pub mod analysis;
pub mod assistant;
pub mod config;
pub mod http;
pub mod llm;
pub mod persist;
pub mod transcript;

pub use analysis::{AnalysisEngine, AnalysisError, CoachingAnalysis, CoachingSuggestion};
pub use assistant::{AssistantError, AssistantService, CompanionClient, CompanionConfig};
pub use config::Config;
pub use http::{create_router, AppState};
pub use llm::{ChatCompleter, LlmError, OpenAiChatClient, OpenAiChatConfig};
pub use persist::{
    AppendReport, BatchCoordinator, DatabaseAdapter, EntrySink, PersistError, SaveOutcome,
    SavePolicy, SessionSeed,
};
pub use transcript::{BotInfo, BotStatus, SessionStore, TranscriptEntry};
