//! 眨眼统计
//!
//! 把时长落在正常眨眼区间内的闭眼-睁开片段计为一次眨眼事件，
//! 在滑动窗口上维护频率和平均时长。诊断读数，不参与提醒门控。

use std::collections::VecDeque;

use crate::config::BlinkParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkEvent {
    pub timestamp_ms: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkStats {
    /// 次/分钟
    pub blink_rate: f64,
    pub avg_duration_ms: f64,
    pub blink_count: u32,
}

#[derive(Debug, Clone)]
pub struct BlinkTracker {
    params: BlinkParams,
    close_start_ms: Option<f64>,
    events: VecDeque<BlinkEvent>,
}

impl BlinkTracker {
    pub fn new(params: BlinkParams) -> Self {
        Self {
            params,
            close_start_ms: None,
            events: VecDeque::with_capacity(100),
        }
    }

    /// 每个检测节拍喂入闭眼状态，完成一次合法眨眼时返回事件
    pub fn update(&mut self, is_closed: bool, timestamp_ms: i64) -> Option<BlinkEvent> {
        let timestamp_ms = timestamp_ms as f64;
        let mut completed = None;

        match (self.close_start_ms, is_closed) {
            (None, true) => self.close_start_ms = Some(timestamp_ms),
            (Some(start), false) => {
                let duration = timestamp_ms - start;
                if duration >= self.params.min_blink_duration_ms
                    && duration <= self.params.max_blink_duration_ms
                {
                    let event = BlinkEvent {
                        timestamp_ms,
                        duration_ms: duration,
                    };
                    self.events.push_back(event);
                    completed = Some(event);
                }
                self.close_start_ms = None;
            }
            _ => {}
        }

        let cutoff = timestamp_ms - self.params.window_ms;
        while let Some(front) = self.events.front() {
            if front.timestamp_ms < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }

        completed
    }

    pub fn stats(&self) -> BlinkStats {
        let count = self.events.len() as u32;
        let avg_duration_ms = if count > 0 {
            self.events.iter().map(|e| e.duration_ms).sum::<f64>() / count as f64
        } else {
            0.0
        };

        let blink_rate = match (self.events.front(), self.events.back()) {
            (Some(first), Some(last)) if count >= 2 => {
                let span_min = (last.timestamp_ms - first.timestamp_ms) / 60_000.0;
                if span_min > 0.0 {
                    count as f64 / span_min
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        BlinkStats {
            blink_rate,
            avg_duration_ms,
            blink_count: count,
        }
    }

    pub fn reset(&mut self) {
        self.close_start_ms = None;
        self.events.clear();
    }
}

impl Default for BlinkTracker {
    fn default() -> Self {
        Self::new(BlinkParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_blink_counted() {
        let mut tracker = BlinkTracker::default();
        tracker.update(true, 0);
        let event = tracker.update(false, 150).unwrap();
        assert!((event.duration_ms - 150.0).abs() < 1e-9);
        assert_eq!(tracker.stats().blink_count, 1);
    }

    #[test]
    fn test_sustained_closure_not_a_blink() {
        let mut tracker = BlinkTracker::default();
        tracker.update(true, 0);
        // 闭眼 3 秒后睁开，超出最大眨眼时长
        assert!(tracker.update(false, 3_000).is_none());
        assert_eq!(tracker.stats().blink_count, 0);
    }

    #[test]
    fn test_too_short_flicker_ignored() {
        let mut tracker = BlinkTracker::default();
        tracker.update(true, 0);
        assert!(tracker.update(false, 20).is_none());
    }

    #[test]
    fn test_rate_over_window() {
        let mut tracker = BlinkTracker::default();
        // 每 2 秒眨一次，共 10 次
        for i in 0..10 {
            let base = i * 2_000;
            tracker.update(true, base);
            tracker.update(false, base + 150);
        }
        let stats = tracker.stats();
        assert_eq!(stats.blink_count, 10);
        assert!(stats.blink_rate > 20.0 && stats.blink_rate < 40.0);
    }
}
