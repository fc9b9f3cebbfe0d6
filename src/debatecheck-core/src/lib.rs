//! Debatecheck Core Library
//!
//! Automated fact-checking via simulated multi-party debate: role-conditioned
//! agents argue over a claim and its retrieved evidence, a judge rules, and a
//! verdict extractor turns the free-text ruling into a categorical label.

pub mod backend;
pub mod batch;
pub mod checkpoint;
pub mod dataset;
pub mod debate_format;
pub mod error;
pub mod eval;
pub mod intent;
pub mod mock;
pub mod orchestrator;
pub mod prompts;
pub mod record;
pub mod verdict;

pub use backend::{CompletionBackend, OpenAiBackend};
pub use batch::{BatchScheduler, DEFAULT_CHUNK_SIZE, RunMode, RunSummary};
pub use checkpoint::Checkpoint;
pub use dataset::{Evidence, Example, ExampleSet};
pub use debate_format::{DebateFormat, RoleSpec, Stance, available_formats, get_format};
pub use error::DebateError;
pub use mock::MockBackend;
pub use orchestrator::{DebateCallback, DebateEvent, DebateOrchestrator, Stage, verify_single};
pub use prompts::{PromptCatalog, Statement, StockCatalog, Transcript};
pub use record::SessionRecord;
pub use verdict::{Verdict, extract_from_text, extract_verdict, normalize_label};
