//! EAR 信号平滑
//!
//! 每帧的原始 EAR 抖动明显，使用有界历史窗口上的指数加权平均稳定信号。
//! 历史以返回值形式传出而不是就地修改，便于单元测试。

use crate::types::SAFE_DEFAULT_EAR;

pub const DEFAULT_WINDOW_SIZE: usize = 5;
pub const DEFAULT_CURRENT_WEIGHT: f64 = 0.4;

/// 平滑至少需要的样本数，不足时原样返回当前值
const MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    pub value: f64,
    pub history: Vec<f64>,
}

/// 对当前样本做指数加权平滑。
///
/// - `current` 为 NaN、≤0 或 >1 时拒绝样本，返回 `None`（历史不变）
/// - 样本追加进历史，超出 `window_size` 时从头部截断
/// - 样本数不足 3 时返回未平滑的 `current`（历史仍然更新）
/// - 否则第 i 个样本（从最旧起 0 计）权重为 `(1-current_weight)^(N-1-i)`，
///   最新样本权重最大
pub fn smooth(
    current: f64,
    history: &[f64],
    window_size: usize,
    current_weight: f64,
) -> Option<Smoothed> {
    if current.is_nan() || current <= 0.0 || current > 1.0 {
        return None;
    }

    let mut updated = history.to_vec();
    updated.push(current);
    if updated.len() > window_size {
        let excess = updated.len() - window_size;
        updated.drain(..excess);
    }

    if updated.len() < MIN_SAMPLES {
        return Some(Smoothed {
            value: current,
            history: updated,
        });
    }

    let n = updated.len();
    let base = 1.0 - current_weight;
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (i, &sample) in updated.iter().enumerate() {
        let weight = base.powi((n - 1 - i) as i32);
        weighted_sum += weight * sample;
        total_weight += weight;
    }

    Some(Smoothed {
        value: weighted_sum / total_weight,
        history: updated,
    })
}

/// 会话循环使用的有状态包装，持有历史和最近一次平滑值。
/// 无效样本直接沿用上一次的平滑结果。
#[derive(Debug, Clone)]
pub struct EarSmoother {
    window_size: usize,
    current_weight: f64,
    history: Vec<f64>,
    last_value: f64,
}

impl EarSmoother {
    pub fn new(window_size: usize, current_weight: f64) -> Self {
        Self {
            window_size: window_size.max(1),
            current_weight: current_weight.clamp(0.0, 1.0),
            history: Vec::with_capacity(window_size.max(1)),
            last_value: SAFE_DEFAULT_EAR,
        }
    }

    pub fn update(&mut self, current: f64) -> f64 {
        if let Some(result) = smooth(current, &self.history, self.window_size, self.current_weight)
        {
            self.history = result.history;
            self.last_value = result.value;
        }
        self.last_value
    }

    pub fn last(&self) -> f64 {
        self.last_value
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_value = SAFE_DEFAULT_EAR;
    }
}

impl Default for EarSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_CURRENT_WEIGHT)
    }
}
