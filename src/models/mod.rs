pub mod event;
pub mod sample;
pub mod session;
pub mod target;

pub use event::{GazeEvent, NodOrigin};
pub use sample::{GazePacket, GazeSample, Point, Rect, SampleSource, TimestampMs};
pub use session::{SessionStats, TrackingStatus};
pub use target::{HoverTarget, SentenceRef};
