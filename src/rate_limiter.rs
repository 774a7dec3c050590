// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A token bucket rate limiter over fractional credits
///
/// Credits accrue continuously at `credits_per_second` up to `max_balance`;
/// each grant consumes the requested cost. Rates below 1.0 are meaningful:
/// 0.1 credits per second grants one unit roughly every ten seconds.
#[derive(Clone)]
pub struct RateLimiter {
    /// Accrual rate; fixed at construction so it needs no locking
    credits_per_second: f64,

    /// Inner state protected by a mutex for thread safety
    inner: Arc<Mutex<RateLimiterState>>,
}

/// The internal state of the rate limiter
struct RateLimiterState {
    /// Credits currently available
    balance: f64,

    /// Cap on accrued credits, i.e. the burst window
    max_balance: f64,

    /// Last time the balance was brought forward
    last_tick: Instant,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock().unwrap();
        f.debug_struct("RateLimiter")
            .field("credits_per_second", &self.credits_per_second)
            .field("balance", &state.balance)
            .field("max_balance", &state.max_balance)
            .finish()
    }
}

impl RateLimiter {
    /// Creates a new RateLimiter starting with a full balance.
    ///
    /// # Parameters
    /// * `credits_per_second` - accrual rate; zero or negative disallows all
    ///   requests
    /// * `max_balance` - burst cap on accrued credits
    pub fn new(credits_per_second: f64, max_balance: f64) -> Self {
        let state = RateLimiterState {
            balance: max_balance,
            max_balance,
            last_tick: Instant::now(),
        };

        RateLimiter {
            credits_per_second,
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Tries to withdraw `item_cost` credits.
    ///
    /// # Returns
    /// `true` if the balance covered the cost, `false` otherwise
    pub fn check_credit(&self, item_cost: f64) -> bool {
        if self.credits_per_second <= 0.0 {
            return false;
        }

        let mut state = self.inner.lock().unwrap();

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_tick).as_secs_f64();
        state.last_tick = now;

        state.balance = (state.balance + elapsed * self.credits_per_second).min(state.max_balance);

        if state.balance >= item_cost {
            state.balance -= item_cost;
            return true;
        }
        false
    }

    /// Returns the accrual rate this limiter was built with
    pub fn credits_per_second(&self) -> f64 {
        self.credits_per_second
    }
}
