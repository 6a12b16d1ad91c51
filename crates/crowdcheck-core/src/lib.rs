//! Crowdcheck Core: data model, collaborator contracts and clock
//!
//! Shared vocabulary for the crowd-report verification engine. Everything
//! that talks to the outside world (report history, weather provider, wall
//! clock) is expressed here as a trait so the engine can be driven by
//! in-memory doubles in tests.

pub mod clock;
pub mod data_model;
pub mod error;
pub mod history;
pub mod weather;

pub use clock::{Clock, ManualClock, SystemClock};
pub use data_model::{
    Admission, BoundingBox, CheckName, CheckStatus, Coordinates, DuplicateVerdict,
    ReportAnnotations, ReportRecord, ReportSubmission, TrustScore, VerificationCheck,
    VerificationResult, WeatherSnapshot,
};
pub use error::{CrowdError, HistoryError, ProviderError};
pub use history::{HistoryFilter, HistoryStore, MemoryHistory};
pub use weather::{Conditions, GeoPoint, WeatherProvider};

/// Engine version reported by the health endpoint
pub const CROWDCHECK_VERSION: &str = "1.0.0";
