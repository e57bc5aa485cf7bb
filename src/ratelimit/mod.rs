//! Per-client fixed-window rate limiting over the shared key-value store.
//!
//! `check` is read-only and `increment` is a separate read-then-write, so
//! concurrent requests from one client may overshoot the cap slightly. The
//! store has no locking primitive and none is simulated here.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::config::RateLimitConfig;
use crate::domain::Failure;
use crate::store::{effective_ttl, KvStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub count: u32,
    /// Epoch milliseconds at which the window opened.
    pub window_start: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the window rolls over; only set when denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    /// The `rate_limited` failure to hand back when rejecting a request.
    pub fn to_failure(&self) -> Failure {
        match self.retry_after {
            Some(secs) => Failure::rate_limited(format!(
                "Rate limit exceeded. Try again in {} seconds",
                secs
            )),
            None => Failure::rate_limited("Rate limit exceeded"),
        }
    }
}

fn rate_limit_key(client_id: &str) -> String {
    format!("ratelimit:{}", client_id)
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KvStore + Send + Sync>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore + Send + Sync>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub async fn check(&self, client_id: &str) -> Result<RateLimitDecision> {
        self.check_at(client_id, Utc::now().timestamp_millis()).await
    }

    pub async fn increment(&self, client_id: &str) -> Result<()> {
        self.increment_at(client_id, Utc::now().timestamp_millis())
            .await
    }

    async fn read_record(&self, client_id: &str) -> Result<Option<RateLimitRecord>> {
        let Some(raw) = self.store.get(&rate_limit_key(client_id)).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Ignoring malformed rate limit record for {}: {}", client_id, e);
                Ok(None)
            }
        }
    }

    /// The record if its window is still open at `now_ms`.
    async fn current_record(&self, client_id: &str, now_ms: i64) -> Result<Option<RateLimitRecord>> {
        let window_ms = self.config.window_ms();
        Ok(self
            .read_record(client_id)
            .await?
            .filter(|r| now_ms < r.window_start.saturating_add(window_ms)))
    }

    async fn check_at(&self, client_id: &str, now_ms: i64) -> Result<RateLimitDecision> {
        let capacity = self.config.max_requests;

        let Some(record) = self.current_record(client_id, now_ms).await? else {
            return Ok(RateLimitDecision {
                allowed: true,
                remaining: capacity,
                retry_after: None,
            });
        };

        let remaining = capacity.saturating_sub(record.count);
        if remaining > 0 {
            return Ok(RateLimitDecision {
                allowed: true,
                remaining,
                retry_after: None,
            });
        }

        let reset_in_ms = record
            .window_start
            .saturating_add(self.config.window_ms())
            .saturating_sub(now_ms)
            .max(0);
        let retry_after = u64::try_from(reset_in_ms).unwrap_or(0).div_ceil(1000).max(1);

        tracing::debug!("Client {} rate limited for {}s", client_id, retry_after);

        Ok(RateLimitDecision {
            allowed: false,
            remaining: 0,
            retry_after: Some(retry_after),
        })
    }

    async fn increment_at(&self, client_id: &str, now_ms: i64) -> Result<()> {
        let record = match self.current_record(client_id, now_ms).await? {
            Some(record) => RateLimitRecord {
                count: record.count.saturating_add(1),
                ..record
            },
            None => RateLimitRecord {
                count: 1,
                window_start: now_ms,
            },
        };

        let raw = serde_json::to_string(&record)?;
        let ttl = effective_ttl(self.store.as_ref(), self.config.window_secs);
        self.store.put(&rate_limit_key(client_id), &raw, ttl).await
    }
}

/// [`RateLimiter::check`] with the default window and capacity.
pub async fn check_rate_limit(
    store: &Arc<dyn KvStore + Send + Sync>,
    client_id: &str,
) -> Result<RateLimitDecision> {
    RateLimiter::new(store.clone(), RateLimitConfig::default())
        .check(client_id)
        .await
}

/// [`RateLimiter::increment`] with the default window and capacity.
pub async fn increment_rate_limit(
    store: &Arc<dyn KvStore + Send + Sync>,
    client_id: &str,
) -> Result<()> {
    RateLimiter::new(store.clone(), RateLimitConfig::default())
        .increment(client_id)
        .await
}
