use thiserror::Error;

/// 追踪子系统的错误分类，全部可恢复，不会导致宿主应用崩溃
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("camera access denied")]
    CameraAccessDenied,

    #[error("no camera device available")]
    CameraUnavailable,

    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("detection failed: {0}")]
    Detection(String),

    #[error("storage error: {0}")]
    Storage(String),
}
