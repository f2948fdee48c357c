#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use wellness_algo::{
    EmotionScores, FaceBox, FaceObservation, FrameObservation, Point2D, StateStore,
};

/// 多个会话共享同一份持久化状态（模拟页面重载）
#[derive(Clone, Default)]
pub struct SharedStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for SharedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// 构造产生指定 EAR 的 6 个眼部关键点：
/// 水平距离 3，上下眼睑各偏移 h，EAR = 2h/3
pub fn eye_points(ear: f64) -> Vec<Point2D> {
    let h = 1.5 * ear;
    vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(1.0, h),
        Point2D::new(2.0, h),
        Point2D::new(3.0, 0.0),
        Point2D::new(2.0, -h),
        Point2D::new(1.0, -h),
    ]
}

pub fn face_frame(ear: f64, emotions: EmotionScores) -> FrameObservation {
    FrameObservation::Face(FaceObservation {
        // 正方形包围盒，几何策略不会改变阈值
        bbox: FaceBox {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 200.0,
        },
        left_eye: eye_points(ear),
        right_eye: eye_points(ear),
        emotions,
    })
}

pub fn neutral_face(ear: f64) -> FrameObservation {
    face_frame(ear, EmotionScores::default())
}
