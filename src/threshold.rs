//! 闭眼阈值的自适应调整
//!
//! 两个互相独立的策略：
//! - 几何策略：由人脸包围盒宽高比推导阈值，带防抖；
//! - 标定策略：取最近 EAR 历史的下四分位数并附加安全边际。
//!
//! 任何退化输入（空历史、非正的包围盒尺寸）都不会改变当前阈值。

use tracing::debug;

use crate::config::ThresholdParams;
use crate::types::FaceBox;

#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    params: ThresholdParams,
    current: f64,
    calibrated: bool,
}

impl AdaptiveThreshold {
    pub fn new(params: ThresholdParams) -> Self {
        let current = params.base.clamp(params.geometry_min, params.geometry_max);
        Self {
            params,
            current,
            calibrated: false,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// 几何策略：脸部越窄（宽高比越大）EAR 基线越高，阈值随之上调。
    /// 只有当候选值与当前阈值差异超过防抖量时才应用，返回是否更新。
    pub fn update_from_geometry(&mut self, bbox: &FaceBox) -> bool {
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            return false;
        }

        let aspect = (bbox.height / bbox.width).clamp(0.6, 1.4);
        let candidate = (self.params.base * aspect)
            .clamp(self.params.geometry_min, self.params.geometry_max);

        if (candidate - self.current).abs() <= self.params.jitter_delta {
            return false;
        }

        debug!(old = self.current, new = candidate, "geometry threshold update");
        self.current = candidate;
        true
    }

    /// 标定策略：历史升序排序后取 25 分位的值乘以边际系数。
    /// 结果落在允许区间内才接受，接受后置位 `calibrated`。
    pub fn calibrate(&mut self, ear_history: &[f64]) -> Option<f64> {
        if ear_history.len() < self.params.min_calibration_samples {
            return None;
        }

        let mut sorted = ear_history.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let quartile_idx = sorted.len() / 4;
        let candidate = sorted[quartile_idx] * self.params.calibration_margin;

        if candidate < self.params.calibration_min || candidate > self.params.calibration_max {
            debug!(candidate, "calibration candidate out of range, keeping threshold");
            return None;
        }

        self.current = candidate;
        self.calibrated = true;
        Some(candidate)
    }
}

impl Default for AdaptiveThreshold {
    fn default() -> Self {
        Self::new(ThresholdParams::default())
    }
}
