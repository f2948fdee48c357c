//! # wellness-algo - 摄像头健康追踪核心算法库
//!
//! 本 crate 提供纯 Rust 实现的视觉健康追踪算法:
//!
//! - **EAR 几何计算** - 基于眼部关键点的纵横比
//! - **信号平滑** - 有界窗口上的指数加权平均
//! - **自适应阈值** - 几何策略与分位数标定
//! - **闭眼状态机** - 持续闭眼的一次性休息提醒
//! - **表情聚合与内容建议** - 主导表情到建议分类的映射
//!
//! ## 设计理念
//!
//! - **纯 Rust** - 不依赖任何绑定层，可嵌入任意宿主
//! - **确定性** - 逻辑时钟驱动，全部行为可用合成时间复现
//! - **可恢复** - 每类失败都降级为功能部分不可用，从不让宿主崩溃
//!
//! ## 模块结构
//!
//! - [`geometry`] - EAR (Eye Aspect Ratio) 计算
//! - [`smoothing`] - EAR 信号平滑
//! - [`threshold`] - 闭眼阈值的自适应调整
//! - [`closure`] - 闭眼有限状态机
//! - [`emotion`] - 表情概率的混合与聚合
//! - [`suggestion`] - 内容建议引擎（冷却 + 会话一次性门控）
//! - [`perclos`] - PERCLOS 闭眼时间占比（诊断）
//! - [`blink`] - 眨眼统计（诊断）
//! - [`scheduler`] - 逻辑时钟定时器调度
//! - [`store`] - 跨重载存活的持久化门控状态
//! - [`session`] - 追踪会话编排
//! - [`config`] - 参数配置
//!
//! ## 使用示例
//!
//! ```rust
//! use wellness_algo::{
//!     FrameObservation, MemoryStore, TrackerConfig, TrackerError, TrackingSession,
//! };
//!
//! let mut session = TrackingSession::new(
//!     TrackerConfig::default(),
//!     Box::new(MemoryStore::new()),
//!     "user-1",
//! );
//! // 相机获取失败时会话降级运行，兜底建议照常
//! session.start(0, Err(TrackerError::CameraUnavailable));
//! let events = session.advance(100, Some(FrameObservation::NoFace));
//! assert!(events.is_empty());
//! ```

pub mod blink;
pub mod closure;
pub mod config;
pub mod emotion;
pub mod error;
pub mod geometry;
pub mod perclos;
pub mod scheduler;
pub mod session;
pub mod smoothing;
pub mod store;
pub mod suggestion;
pub mod threshold;
pub mod types;

pub use blink::{BlinkEvent, BlinkStats, BlinkTracker};
pub use closure::{ClosureStateMachine, ClosureTransition, EyeSignal, EyeState};
pub use config::{
    BlinkParams, ClosureParams, EmotionParams, PerclosParams, SmoothingParams, SuggestionParams,
    ThresholdParams, TrackerConfig,
};
pub use emotion::{DominantEmotion, EmotionAggregator};
pub use error::TrackerError;
pub use geometry::{average_ear, compute_ear};
pub use perclos::PerclosGauge;
pub use scheduler::{Scheduler, TimerId};
pub use session::{
    wall_clock_ms, CameraStream, SharedSession, TrackerDiagnostics, TrackingSession,
};
pub use smoothing::{smooth, EarSmoother, Smoothed};
pub use store::{
    load_flags, save_flags, state_key, JsonFileStore, MemoryStore, PersistedFlags, StateStore,
};
pub use suggestion::SuggestionEngine;
pub use threshold::AdaptiveThreshold;
pub use types::{
    Emotion, EmotionScores, FaceBox, FaceObservation, FrameObservation, NotificationPayload,
    Point2D, SuggestionCategory, SuggestionPayload, TrackerEvent, SAFE_DEFAULT_EAR,
};
