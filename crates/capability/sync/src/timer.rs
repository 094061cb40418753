//! 轮询定时器。
//!
//! 只在两个时机变更：进入 Polling 时 `arm`，进入 Idle 时 `disarm`。
//! 未武装时 `tick` 永不就绪，迟到的 tick 无法复活已结束的轮询。

use std::future;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

pub(crate) struct PollTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl PollTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 从现在起一个周期后首次触发；周期内错过的 tick 被合并而不是补发。
    pub fn arm(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    pub fn disarm(&mut self) {
        self.interval = None;
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_after_one_period() {
        let mut timer = PollTimer::new(Duration::from_millis(2000));
        timer.arm();
        let started = Instant::now();
        timer.tick().await;
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_timer_never_fires() {
        let mut timer = PollTimer::new(Duration::from_millis(2000));
        timer.arm();
        timer.disarm();
        assert!(timer.interval.is_none());
        let fired = tokio::time::timeout(Duration::from_secs(60), timer.tick()).await;
        assert!(fired.is_err());
    }
}
