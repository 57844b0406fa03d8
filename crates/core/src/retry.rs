use std::time::Duration;

/// Ordered wait durations plus a retry budget.
///
/// `delay(n)` is the wait before retry `n`; past the end of the list the last
/// entry repeats.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_retries: usize,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, max_retries: usize) -> Self {
        Self {
            delays,
            max_retries,
        }
    }

    pub fn fixed(delay: Duration, max_retries: usize) -> Self {
        Self::new(vec![delay], max_retries)
    }

    /// One retry per listed delay.
    pub fn escalating(delays: Vec<Duration>) -> Self {
        let max_retries = delays.len();
        Self::new(delays, max_retries)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn delay(&self, retry: usize) -> Duration {
        self.delays
            .get(retry)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Check `settled` up to `max_retries + 1` times, calling `recover` with
    /// the retry index and its delay between checks.
    ///
    /// `Ok(None)` means the budget ran out; errors from either closure stop
    /// the loop immediately.
    pub fn run<S: ?Sized, T, E>(
        &self,
        state: &mut S,
        mut settled: impl FnMut(&mut S, usize) -> Result<Option<T>, E>,
        mut recover: impl FnMut(&mut S, usize, Duration) -> Result<(), E>,
    ) -> Result<Option<T>, E> {
        for retry in 0..self.max_retries {
            if let Some(value) = settled(state, retry)? {
                return Ok(Some(value));
            }
            recover(state, retry, self.delay(retry))?;
        }
        settled(state, self.max_retries)
    }
}
