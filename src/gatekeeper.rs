//! Per-user run limiter consulted before a triggered run is processed.
//!
//! Counts the actor's recent runs inside a sliding window. Cancelled runs and
//! runs that finished faster than `min_run_duration` do not count. A failed
//! history lookup allows the run.

use crate::authorize::RepoSlug;
use crate::config::GatekeeperConfig;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// One past run of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    /// `None` while the run is still in progress.
    pub duration: Option<Duration>,
    pub cancelled: bool,
}

pub type HistoryFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<RunRecord>>> + Send + 'a>>;

/// Source of recent runs triggered by a user.
pub trait TriggerHistory: Send + Sync {
    fn recent_runs<'a>(
        &'a self,
        repository: &'a RepoSlug,
        actor: &'a str,
        since: DateTime<Utc>,
    ) -> HistoryFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateReason {
    WithinLimit,
    LimitReached,
    /// History could not be read; the run is allowed.
    HistoryUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub reason: GateReason,
    pub counted_runs: usize,
}

#[derive(Debug, Clone)]
pub struct RateLimitGate {
    window: Duration,
    max_runs: u32,
    min_run_duration: Duration,
}

impl RateLimitGate {
    pub fn new(window: Duration, max_runs: u32, min_run_duration: Duration) -> Self {
        Self {
            window,
            max_runs,
            min_run_duration,
        }
    }

    pub fn from_config(config: &GatekeeperConfig) -> Self {
        Self::new(
            Duration::from_secs(config.window_minutes.saturating_mul(60)),
            config.max_runs,
            Duration::from_secs(config.min_run_secs),
        )
    }

    pub async fn check(
        &self,
        history: &dyn TriggerHistory,
        repository: &RepoSlug,
        actor: &str,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let window = TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX);
        let since = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let runs = match history.recent_runs(repository, actor, since).await {
            Ok(runs) => runs,
            Err(e) => {
                tracing::warn!(actor, "Trigger history unavailable, allowing run: {e:#}");
                return GateDecision {
                    allowed: true,
                    reason: GateReason::HistoryUnavailable,
                    counted_runs: 0,
                };
            }
        };

        let counted_runs = runs
            .iter()
            .filter(|run| !run.cancelled && run.started_at >= since)
            .filter(|run| run.duration.is_none_or(|d| d >= self.min_run_duration))
            .count();
        let limit = usize::try_from(self.max_runs).unwrap_or(usize::MAX);
        let allowed = counted_runs < limit;

        if allowed {
            tracing::debug!(actor, counted_runs, limit, "Run within per-user limit");
        } else {
            tracing::warn!(actor, counted_runs, limit, "Per-user run limit reached");
        }
        GateDecision {
            allowed,
            reason: if allowed {
                GateReason::WithinLimit
            } else {
                GateReason::LimitReached
            },
            counted_runs,
        }
    }
}
