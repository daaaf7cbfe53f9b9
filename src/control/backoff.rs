//! Bounded fixed-interval retry.
//!
//! Used for the boot-time Wi-Fi bring-up and the per-cycle MQTT
//! reconnect.  The delay is injected so tests can run on a manual clock.

use core::fmt::Display;

use log::{info, warn};

use crate::app::ports::DelayPort;

/// How often and how far apart to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries until success.
    pub max_attempts: Option<u32>,
    pub backoff_ms: u32,
}

impl RetryPolicy {
    pub fn limited(max_attempts: u32, backoff_ms: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff_ms,
        }
    }

    pub fn unbounded(backoff_ms: u32) -> Self {
        Self {
            max_attempts: None,
            backoff_ms,
        }
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// `op` receives the 1-based attempt number.  The delay runs *between*
/// attempts only, so `n` attempts sleep `n - 1` times.  On exhaustion the
/// last error is returned.
pub fn retry<T, E: Display>(
    label: &str,
    policy: &RetryPolicy,
    delay: &mut impl DelayPort,
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt: u32 = 1;
    loop {
        match op(attempt) {
            Ok(v) => {
                if attempt > 1 {
                    info!("{}: succeeded on attempt {}", label, attempt);
                }
                return Ok(v);
            }
            Err(e) => {
                match policy.max_attempts {
                    Some(max) => warn!("{}: attempt {}/{} failed: {}", label, attempt, max, e),
                    None => warn!("{}: attempt {} failed: {}", label, attempt, e),
                }
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(e);
                }
            }
        }
        delay.delay_ms(policy.backoff_ms);
        attempt = attempt.saturating_add(1);
    }
}
