pub mod backend;
pub mod clock;
pub mod source;
pub mod synthetic;

pub use backend::{parse_backend_message, parse_timestamp, Viewport};
pub use clock::TrackerClock;
pub use source::{SourceMode, SourceSelector};
pub use synthetic::{SyntheticGazeGenerator, SYNTHETIC_INTERVAL_MS};
