//! Pipeline stages
//!
//! One module per stage, each an [`crate::Agent`] implementation. Stages
//! never invoke each other; the orchestrator feeds each stage the previous
//! stage's output.

pub mod audio;
pub mod ingest;
pub mod memory;
pub mod outline;
pub mod publish;
pub mod rank;
pub mod review;
pub mod script;
pub mod tts_plan;

pub use audio::{AudioAgent, AudioInput, AudioOutput};
pub use ingest::{IngestAgent, IngestInput};
pub use memory::{ListenerProfile, MemoryAgent, MemoryInput};
pub use outline::{OutlineAgent, OutlineInput};
pub use publish::{PublishAgent, PublishInput, PublishOutput};
pub use rank::{RankAgent, RankInput};
pub use review::{FactCheckAgent, ReviewInput, ReviewOutput, SafetyAgent};
pub use script::{ScriptAgent, ScriptInput};
pub use tts_plan::{TtsPlanAgent, TtsPlanInput};
