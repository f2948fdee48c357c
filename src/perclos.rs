//! PERCLOS (Percentage of Eye Closure)
//!
//! 滑动时间窗口内闭眼时间的占比，时间加权统计。
//! 仅作为诊断读数暴露，不参与提醒门控。

use std::collections::VecDeque;

use crate::config::PerclosParams;

#[derive(Debug, Clone, Copy)]
struct EyeSample {
    is_closed: bool,
    timestamp_ms: f64,
}

#[derive(Debug, Clone)]
pub struct PerclosGauge {
    params: PerclosParams,
    samples: VecDeque<EyeSample>,
    current: f64,
}

impl PerclosGauge {
    pub fn new(params: PerclosParams) -> Self {
        Self {
            params,
            samples: VecDeque::with_capacity(240),
            current: 0.0,
        }
    }

    pub fn update(&mut self, is_closed: bool, timestamp_ms: i64) -> f64 {
        let timestamp_ms = timestamp_ms as f64;
        self.samples.push_back(EyeSample {
            is_closed,
            timestamp_ms,
        });

        let cutoff = timestamp_ms - self.params.window_ms;
        while let Some(front) = self.samples.front() {
            if front.timestamp_ms < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        self.current = self.compute();
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// 窗口是否已经覆盖到一半以上的时间跨度
    pub fn is_warmed_up(&self) -> bool {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => {
                last.timestamp_ms - first.timestamp_ms >= self.params.window_ms * 0.5
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.current = 0.0;
    }

    /// 相邻样本之间的时间段，前一样本闭眼则该段计入闭眼时间
    fn compute(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }

        let mut closed = 0.0;
        let mut total = 0.0;
        let mut iter = self.samples.iter();
        let Some(mut prev) = iter.next() else {
            return 0.0;
        };

        for curr in iter {
            let dt = curr.timestamp_ms - prev.timestamp_ms;
            if dt > 0.0 {
                total += dt;
                if prev.is_closed {
                    closed += dt;
                }
            }
            prev = curr;
        }

        if total < 1e-6 {
            return 0.0;
        }
        (closed / total).clamp(0.0, 1.0)
    }
}

impl Default for PerclosGauge {
    fn default() -> Self {
        Self::new(PerclosParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_open_is_zero() {
        let mut gauge = PerclosGauge::default();
        for i in 0..10 {
            gauge.update(false, i * 100);
        }
        assert_eq!(gauge.current(), 0.0);
    }

    #[test]
    fn test_half_closed() {
        let mut gauge = PerclosGauge::default();
        for i in 0..10 {
            gauge.update(i % 2 == 0, i * 100);
        }
        let perclos = gauge.current();
        assert!(perclos > 0.4 && perclos < 0.7);
    }

    #[test]
    fn test_old_samples_evicted() {
        let mut gauge = PerclosGauge::new(PerclosParams { window_ms: 1_000.0 });
        // 窗口外的闭眼样本不再影响结果
        gauge.update(true, 0);
        gauge.update(true, 100);
        for i in 0..20 {
            gauge.update(false, 2_000 + i * 100);
        }
        assert_eq!(gauge.current(), 0.0);
    }

    #[test]
    fn test_warm_up() {
        let mut gauge = PerclosGauge::new(PerclosParams { window_ms: 1_000.0 });
        gauge.update(false, 0);
        assert!(!gauge.is_warmed_up());
        gauge.update(false, 600);
        assert!(gauge.is_warmed_up());
    }
}
