// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("rate limit exceeded: more than {max} requests per {window_secs}s")]
pub struct RateLimited {
    pub max: u32,
    pub window_secs: u64,
}

/// Fixed-window request budget per caller key. An owned instance with an
/// explicit lifecycle, injected where needed: tests build their own, nothing
/// hides in module-level state.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    hits: HashMap<String, (Instant, u32)>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            hits: HashMap::new(),
        }
    }

    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    /// Record one request for `caller`; fails fast when the budget for the
    /// current window is spent.
    pub fn check(&mut self, caller: &str) -> Result<(), RateLimited> {
        self.check_at(caller, Instant::now())
    }

    pub fn check_at(&mut self, caller: &str, now: Instant) -> Result<(), RateLimited> {
        let entry = self.hits.entry(caller.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        if entry.1 >= self.max_per_window {
            return Err(RateLimited {
                max: self.max_per_window,
                window_secs: self.window.as_secs(),
            });
        }
        entry.1 += 1;
        Ok(())
    }
}
