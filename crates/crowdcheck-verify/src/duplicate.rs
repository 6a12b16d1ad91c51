//! Duplicate and cluster detection
//!
//! Runs before any scoring. Rejects identities that flood the window and
//! areas that are already saturated with reports. Storage errors fail open.

use crowdcheck_core::{
    BoundingBox, Clock, DuplicateVerdict, HistoryError, HistoryFilter, HistoryStore,
    ReportSubmission,
};
use std::sync::Arc;

use crate::profile::EngineProfile;

pub const IDENTITY_FLOOD_REASON: &str = "too many reports from same identity in window";
pub const AREA_CLUSTER_REASON: &str = "multiple reports from same area";

pub struct DuplicateDetector {
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    max_per_identity: usize,
    max_per_area: usize,
    area_delta: f64,
}

impl DuplicateDetector {
    pub fn new(
        profile: &EngineProfile,
        history: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            history,
            clock,
            window: profile.duplicate_window(),
            max_per_identity: profile.max_reports_per_identity,
            max_per_area: profile.max_reports_per_area,
            area_delta: profile.area_delta_degrees,
        }
    }

    /// Verdict with the fail-open fallback applied
    pub async fn check(&self, submission: &ReportSubmission) -> DuplicateVerdict {
        match self.try_check(submission).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::warn!(error = %err, "duplicate check failed, admitting");
                DuplicateVerdict::clear()
            }
        }
    }

    pub async fn try_check(
        &self,
        submission: &ReportSubmission,
    ) -> Result<DuplicateVerdict, HistoryError> {
        let since = self.clock.now() - self.window;

        if let Some(identity) = submission.network_identity.as_deref().filter(|s| !s.is_empty()) {
            let filter = HistoryFilter::new().identity(identity).since(since);
            let recent = self
                .history
                .find_recent(&filter, Some(self.max_per_identity))
                .await?;
            if recent.len() >= self.max_per_identity {
                tracing::info!(%identity, count = recent.len(), "identity flood rejected");
                return Ok(DuplicateVerdict::duplicate(IDENTITY_FLOOD_REASON));
            }
        }

        if let Some(at) = submission.coordinates {
            let filter = HistoryFilter::new()
                .within(BoundingBox::around(at, self.area_delta))
                .since(since);
            let nearby = self
                .history
                .find_recent(&filter, Some(self.max_per_area))
                .await?;
            if nearby.len() >= self.max_per_area {
                tracing::info!(
                    latitude = at.latitude,
                    longitude = at.longitude,
                    count = nearby.len(),
                    "area cluster rejected"
                );
                return Ok(DuplicateVerdict::duplicate(AREA_CLUSTER_REASON));
            }
        }

        Ok(DuplicateVerdict::clear())
    }
}
