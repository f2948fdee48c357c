use serde::{Deserialize, Serialize};

use crate::smoothing::{DEFAULT_CURRENT_WEIGHT, DEFAULT_WINDOW_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub window_size: usize,
    pub current_weight: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            current_weight: DEFAULT_CURRENT_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// 基准闭眼阈值
    pub base: f64,
    /// 几何策略的阈值下/上限
    pub geometry_min: f64,
    pub geometry_max: f64,
    /// 几何策略的防抖：变化量低于该值时不更新
    pub jitter_delta: f64,
    /// 标定策略接受的阈值范围
    pub calibration_min: f64,
    pub calibration_max: f64,
    /// 标定值的安全边际系数
    pub calibration_margin: f64,
    /// 标定至少需要的历史样本数
    pub min_calibration_samples: usize,
    /// 自动标定前的预热时长（毫秒）
    pub warmup_ms: i64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            base: 0.25,
            geometry_min: 0.05,
            geometry_max: 0.3,
            jitter_delta: 0.02,
            calibration_min: 0.05,
            calibration_max: 0.15,
            calibration_margin: 1.05,
            min_calibration_samples: 10,
            warmup_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureParams {
    /// 持续闭眼多久后触发提醒（毫秒）
    pub closure_duration_ms: i64,
    /// 倒计时展示的刷新间隔（毫秒）
    pub countdown_interval_ms: i64,
    /// 连续检测失败多少次后提示用户调整环境
    pub failure_hint_threshold: u32,
}

impl Default for ClosureParams {
    fn default() -> Self {
        Self {
            closure_duration_ms: 3_000,
            countdown_interval_ms: 1_000,
            failure_hint_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionParams {
    /// 新观测在混合中的权重（其余为旧状态）
    pub blend_new_weight: f64,
    /// 对最大分量的放大系数
    pub boost_factor: f64,
    /// 表情快照历史长度
    pub history_len: usize,
    /// 每 tick 主导表情的滚动历史长度
    pub dominant_history_len: usize,
    /// 表情分析的周期（毫秒）
    pub analysis_interval_ms: i64,
}

impl Default for EmotionParams {
    fn default() -> Self {
        Self {
            blend_new_weight: 0.85,
            boost_factor: 1.15,
            history_len: 20,
            dominant_history_len: 10,
            analysis_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionParams {
    /// 主导表情平均概率超过该值才触发建议
    pub strength_threshold: f64,
    /// 两次建议之间的最小间隔（毫秒，持久化保证跨会话生效）
    pub cooldown_ms: i64,
    /// 可见建议的自动过期时长（毫秒）
    pub visible_ms: i64,
    /// 无表情建议时的兜底延迟（毫秒）
    pub fallback_delay_ms: i64,
    /// 兜底的再次备份延迟（毫秒）
    pub backup_delay_ms: i64,
    /// 最后一道备份：前两次兜底都被冷却拦下时兜住冷却结束后的窗口（毫秒）
    pub final_backup_delay_ms: i64,
}

impl Default for SuggestionParams {
    fn default() -> Self {
        Self {
            strength_threshold: 0.25,
            cooldown_ms: 60_000,
            visible_ms: 15_000,
            fallback_delay_ms: 15_000,
            backup_delay_ms: 30_000,
            final_backup_delay_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerclosParams {
    /// 统计窗口（毫秒）
    pub window_ms: f64,
}

impl Default for PerclosParams {
    fn default() -> Self {
        Self { window_ms: 60_000.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkParams {
    /// 计入眨眼事件的最短/最长闭眼时长（毫秒）
    pub min_blink_duration_ms: f64,
    pub max_blink_duration_ms: f64,
    /// 眨眼统计的滑动窗口（毫秒）
    pub window_ms: f64,
}

impl Default for BlinkParams {
    fn default() -> Self {
        Self {
            min_blink_duration_ms: 50.0,
            max_blink_duration_ms: 400.0,
            window_ms: 60_000.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub smoothing: SmoothingParams,
    pub threshold: ThresholdParams,
    pub closure: ClosureParams,
    pub emotion: EmotionParams,
    pub suggestion: SuggestionParams,
    pub perclos: PerclosParams,
    pub blink: BlinkParams,
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WELLNESS_CLOSURE_DURATION_MS") {
            if let Ok(parsed) = val.parse() {
                config.closure.closure_duration_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("WELLNESS_SUGGESTION_COOLDOWN_MS") {
            if let Ok(parsed) = val.parse() {
                config.suggestion.cooldown_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("WELLNESS_STRENGTH_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                config.suggestion.strength_threshold = parsed;
            }
        }
        if let Ok(val) = std::env::var("WELLNESS_EAR_BASE_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                config.threshold.base = parsed;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_within_documented_ranges() {
        let config = TrackerConfig::default();
        assert!(config.threshold.base >= config.threshold.geometry_min);
        assert!(config.threshold.base <= config.threshold.geometry_max);
        assert!(config.threshold.calibration_max < config.threshold.geometry_max);
        assert_eq!(config.closure.closure_duration_ms, 3_000);
        assert_eq!(config.suggestion.cooldown_ms, 60_000);
    }
}
