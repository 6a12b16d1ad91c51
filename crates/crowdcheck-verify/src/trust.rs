//! Reporter trust from verification history
use crowdcheck_core::{HistoryError, HistoryFilter, HistoryStore, TrustScore};
use std::sync::Arc;

use crate::profile::EngineProfile;

pub struct TrustEstimator {
    history: Arc<dyn HistoryStore>,
    history_limit: usize,
    trusted_above: u32,
    distrusted_below: u32,
    bonus: i32,
    penalty: i32,
}

impl TrustEstimator {
    pub fn new(profile: &EngineProfile, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            history,
            history_limit: profile.trust_history_limit,
            trusted_above: profile.trusted_above,
            distrusted_below: profile.distrusted_below,
            bonus: profile.trust_bonus,
            penalty: profile.trust_penalty,
        }
    }

    /// Trust for an identity; neutral when unknown or when history is unreadable
    pub async fn estimate(&self, identity: Option<&str>) -> TrustScore {
        let Some(identity) = identity.filter(|s| !s.is_empty()) else {
            return TrustScore::NEUTRAL;
        };
        match self.try_estimate(identity).await {
            Ok(trust) => trust,
            Err(err) => {
                tracing::warn!(error = %err, %identity, "trust lookup failed, using neutral score");
                TrustScore::NEUTRAL
            }
        }
    }

    pub async fn try_estimate(&self, identity: &str) -> Result<TrustScore, HistoryError> {
        let filter = HistoryFilter::new().identity(identity);
        let history = self
            .history
            .find_recent(&filter, Some(self.history_limit))
            .await?;
        let verified = history.iter().filter(|r| r.is_verified()).count();
        Ok(TrustScore::from_history(verified, history.len()))
    }

    /// Score adjustment for a trust level
    pub fn adjustment_for(&self, trust: TrustScore) -> i32 {
        if trust.value() > self.trusted_above {
            self.bonus
        } else if trust.value() < self.distrusted_below {
            -self.penalty
        } else {
            0
        }
    }
}
