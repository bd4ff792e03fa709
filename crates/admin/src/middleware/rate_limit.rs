//! Login throttling.
//!
//! The console is reached directly (no proxy in front), so the peer address
//! from `ConnectInfo` is the client.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

/// Rate limiter layer keyed by peer IP.
pub type LoginRateLimiter =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Three attempts in a burst, then one every 20 seconds.
#[must_use]
pub fn login_rate_limiter() -> LoginRateLimiter {
    #[allow(clippy::expect_used)]
    let config = GovernorConfigBuilder::default()
        .key_extractor(PeerIpKeyExtractor)
        .per_second(20)
        .burst_size(3)
        .finish()
        .expect("rate limiter config with non-zero period and burst is valid");
    GovernorLayer::new(Arc::new(config))
}
