//! EAR (Eye Aspect Ratio) 计算
//!
//! 基于每只眼睛 6 个有序关键点计算纵横比：
//! 索引 0/3 为左右眼角，1/2 为上眼睑，4/5 为下眼睑。
//! `EAR = (d(p1,p5) + d(p2,p4)) / (2 * d(p0,p3))`
//! 闭眼时 EAR 接近 0，睁眼时通常在 0.2 - 0.4 之间。

use crate::types::{Point2D, SAFE_DEFAULT_EAR};

const MIN_HORIZONTAL_DIST: f64 = 1e-3;

/// 单眼 EAR。输入不足 6 个点、水平距离接近 0 或结果无效时
/// 返回安全默认值而不是 NaN。纯函数，无副作用。
pub fn compute_ear(points: &[Point2D]) -> f64 {
    if points.len() < 6 {
        return SAFE_DEFAULT_EAR;
    }

    let vertical1 = points[1].distance_to(&points[5]);
    let vertical2 = points[2].distance_to(&points[4]);
    let horizontal = points[0].distance_to(&points[3]);

    if horizontal < MIN_HORIZONTAL_DIST {
        return SAFE_DEFAULT_EAR;
    }

    let ear = (vertical1 + vertical2) / (2.0 * horizontal);
    if ear.is_nan() || ear > 1.0 {
        SAFE_DEFAULT_EAR
    } else {
        ear
    }
}

/// 双眼平均 EAR
pub fn average_ear(left_eye: &[Point2D], right_eye: &[Point2D]) -> f64 {
    (compute_ear(left_eye) + compute_ear(right_eye)) / 2.0
}
