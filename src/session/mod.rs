pub mod controller;
pub mod loop_worker;
pub mod processor;
pub mod queue;
pub mod replay;
pub mod report;
pub mod surface;

pub use controller::SessionController;
pub use processor::SessionProcessor;
pub use queue::SampleQueue;
pub use replay::{replay_messages, ReplayOutcome};
pub use report::{ReviewList, SessionReport};
pub use surface::{LayoutSnapshot, ReaderSurface, SentenceLayout, SharedSurface, WordLayout};
