//! Sliding-window throttle for semantic auditor calls.
//!
//! Cost control for the LLM backend: at most `max_requests` calls per
//! window; exceeding the limit starts a cooldown during which every call is
//! refused before it reaches the network. Refused calls resolve fail-closed
//! upstream, so throttling can only ever block, never allow.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{LlmError, LlmResult};

/// Default window capacity (requests per window).
const DEFAULT_MAX_REQUESTS: usize = 10;
/// Default window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default cooldown once the window overflows.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct ThrottleState {
    history: VecDeque<Instant>,
    cooldown_until: Option<Instant>,
}

/// A sliding-window request throttle.
#[derive(Debug)]
pub struct Throttle {
    state: Mutex<ThrottleState>,
    max_requests: usize,
    window: Duration,
    cooldown: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, DEFAULT_COOLDOWN)
    }
}

impl Throttle {
    /// Create a throttle with explicit limits.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(ThrottleState::default()),
            max_requests,
            window,
            cooldown,
        }
    }

    /// Admit or refuse one request.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::RateLimited`] while cooling down or when the
    /// window is full (which also starts a cooldown).
    pub fn admit(&self) -> LlmResult<()> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| {
            tracing::warn!("throttle lock poisoned, recovering");
            e.into_inner()
        });

        while state
            .history
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.window)
        {
            state.history.pop_front();
        }

        if let Some(until) = state.cooldown_until {
            if now < until {
                return Err(LlmError::RateLimited {
                    retry_after_secs: (until - now).as_secs().max(1),
                });
            }
            state.cooldown_until = None;
        }

        if state.history.len() >= self.max_requests {
            state.cooldown_until = Some(now + self.cooldown);
            tracing::warn!(
                max = self.max_requests,
                window_secs = self.window.as_secs(),
                "semantic auditor throttle limit exceeded, cooling down"
            );
            return Err(LlmError::RateLimited {
                retry_after_secs: self.cooldown.as_secs(),
            });
        }

        state.history.push_back(now);
        Ok(())
    }
}
