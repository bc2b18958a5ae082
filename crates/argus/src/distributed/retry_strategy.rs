// argus is a distributed web search engine.
// Copyright (C) 2026 Argus Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Small retry-delay iterators. Kept in-house rather than pulling in a crate
//! for what amounts to one struct.

use std::time::Duration;

/// Exponential back-off: delay grows as `base^n` for the `n`-th attempt,
/// capped at an optional maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: u64,
    base: u64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    pub const fn from_millis(base: u64) -> Self {
        Self {
            current: base,
            base,
            max_delay: None,
        }
    }

    pub const fn with_limit(mut self, limit: Duration) -> Self {
        self.max_delay = Some(limit);
        self
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let duration = Duration::from_millis(self.current);

        if let Some(max_delay) = self.max_delay {
            if duration > max_delay {
                return Some(max_delay);
            }
        }

        self.current = self.current.checked_mul(self.base).unwrap_or(u64::MAX);

        Some(duration)
    }
}

/// A fixed-delay iterator bounded to a number of attempts, used for the
/// dispatcher's bounded crash-recovery queries against storage nodes.
pub struct FixedRetries {
    delay: Duration,
    remaining: usize,
}

impl FixedRetries {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            delay,
            remaining: attempts,
        }
    }
}

impl Iterator for FixedRetries {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_growth() {
        let mut s = ExponentialBackoff::from_millis(10);
        assert_eq!(s.next(), Some(Duration::from_millis(10)));
        assert_eq!(s.next(), Some(Duration::from_millis(100)));
        assert_eq!(s.next(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn respects_limit() {
        let mut s = ExponentialBackoff::from_millis(10).with_limit(Duration::from_millis(50));
        assert_eq!(s.next(), Some(Duration::from_millis(10)));
        assert_eq!(s.next(), Some(Duration::from_millis(50)));
        assert_eq!(s.next(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn fixed_retries_exhausts() {
        let mut s = FixedRetries::new(3, Duration::from_secs(2));
        assert_eq!(s.next(), Some(Duration::from_secs(2)));
        assert_eq!(s.next(), Some(Duration::from_secs(2)));
        assert_eq!(s.next(), Some(Duration::from_secs(2)));
        assert_eq!(s.next(), None);
    }
}
