//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP limits on the prediction routes via tower_governor.

use crate::ApiError;
use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config keyed by peer IP, with X-RateLimit-* headers
pub type PredictionGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests allowed at once
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 20,
        }
    }
}

/// Build the governor config.
///
/// Needs `into_make_service_with_connect_info::<SocketAddr>()` to see peer IPs.
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Arc<PredictionGovernorConfig>, ApiError> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| {
            ApiError::Config(format!(
                "invalid rate limit: per_second={} burst_size={}",
                config.per_second, config.burst_size
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_governor_config() {
        assert!(create_governor_config(&RateLimitConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = RateLimitConfig {
            burst_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            create_governor_config(&config),
            Err(ApiError::Config(_))
        ));
    }
}
