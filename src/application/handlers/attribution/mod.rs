//! Attribution handlers.

mod track_visit;

pub use track_visit::{TrackVisitCommand, TrackVisitHandler};
