//! 追踪会话编排
//!
//! 持有平滑器、自适应阈值、闭眼状态机、表情聚合器、建议引擎与调度器，
//! 把每帧检测结果和逻辑时钟推进转换为发往宿主的命令序列。
//!
//! 原型实现把这些状态散在多个定时器回调里，只因浏览器事件循环的
//! 单线程性质才安全；这里所有可变状态都集中在 `TrackingSession`，
//! 多线程宿主通过 `SharedSession`（互斥锁包装）串行访问。

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blink::BlinkTracker;
use crate::closure::{ClosureStateMachine, ClosureTransition, EyeSignal, EyeState};
use crate::config::TrackerConfig;
use crate::emotion::EmotionAggregator;
use crate::geometry::average_ear;
use crate::perclos::PerclosGauge;
use crate::scheduler::{Scheduler, TimerId};
use crate::smoothing::EarSmoother;
use crate::error::TrackerError;
use crate::store::{load_flags, save_flags, PersistedFlags, StateStore};
use crate::suggestion::SuggestionEngine;
use crate::threshold::AdaptiveThreshold;
use crate::types::{
    FaceObservation, FrameObservation, NotificationPayload, SuggestionPayload, TrackerEvent,
};

/// 相机流的独占所有权。一个会话同时只持有一个流，
/// 停止或析构时保证释放，避免泄漏已打开的相机。
pub trait CameraStream: Send {
    fn release(&mut self);
}

/// 标定历史的上限，足够覆盖数十秒的原始 EAR 样本
const CALIBRATION_HISTORY_CAP: usize = 100;

pub fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerDiagnostics {
    pub smoothed_ear: f64,
    pub threshold: f64,
    pub calibrated: bool,
    pub perclos: f64,
    pub blink_rate: f64,
    pub avg_blink_duration_ms: f64,
    pub consecutive_failures: u32,
}

pub struct TrackingSession {
    config: TrackerConfig,
    user_id: String,
    store: Box<dyn StateStore>,
    flags: PersistedFlags,

    smoother: EarSmoother,
    threshold: AdaptiveThreshold,
    closure: ClosureStateMachine,
    emotion: EmotionAggregator,
    suggestion: SuggestionEngine,
    perclos: PerclosGauge,
    blink: BlinkTracker,
    scheduler: Scheduler,

    camera: Option<Box<dyn CameraStream>>,
    running: bool,
    session_start_ms: Option<i64>,
    calibration_history: Vec<f64>,
    calibration_attempted: bool,
    consecutive_failures: u32,
    hint_shown: bool,
}

impl TrackingSession {
    pub fn new(config: TrackerConfig, store: Box<dyn StateStore>, user_id: impl Into<String>) -> Self {
        Self::with_seed(config, store, user_id, None)
    }

    /// 测试用：固定建议引擎的随机种子
    pub fn with_seed(
        config: TrackerConfig,
        store: Box<dyn StateStore>,
        user_id: impl Into<String>,
        seed: Option<u64>,
    ) -> Self {
        let user_id = user_id.into();
        let mut flags = load_flags(store.as_ref(), &user_id);

        // 会话边界：页面加载清除"本会话已展示建议"标志，冷却时间戳保留；
        // 闭眼提醒标志在同一逻辑会话内跨重载存活
        flags.suggestion_shown = false;

        let mut closure = ClosureStateMachine::new(config.closure.clone());
        closure.restore_notified(flags.closure_notified);

        let mut suggestion = SuggestionEngine::with_seed(config.suggestion.clone(), seed);
        suggestion.restore(flags.suggestion_shown, flags.last_suggestion_ts);

        let mut session = Self {
            smoother: EarSmoother::new(
                config.smoothing.window_size,
                config.smoothing.current_weight,
            ),
            threshold: AdaptiveThreshold::new(config.threshold.clone()),
            closure,
            emotion: EmotionAggregator::new(config.emotion.clone()),
            suggestion,
            perclos: PerclosGauge::new(config.perclos.clone()),
            blink: BlinkTracker::new(config.blink.clone()),
            scheduler: Scheduler::new(),
            camera: None,
            running: false,
            session_start_ms: None,
            calibration_history: Vec::with_capacity(CALIBRATION_HISTORY_CAP),
            calibration_attempted: false,
            consecutive_failures: 0,
            hint_shown: false,
            config,
            user_id,
            store,
            flags,
        };
        session.persist_flags();
        session
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn eye_state(&self) -> EyeState {
        self.closure.state()
    }

    pub fn diagnostics(&self) -> TrackerDiagnostics {
        let blink_stats = self.blink.stats();
        TrackerDiagnostics {
            smoothed_ear: self.smoother.last(),
            threshold: self.threshold.current(),
            calibrated: self.threshold.is_calibrated(),
            perclos: self.perclos.current(),
            blink_rate: blink_stats.blink_rate,
            avg_blink_duration_ms: blink_stats.avg_duration_ms,
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// 开始追踪。已有的相机流先释放再接管新流（先停后起）。
    /// 相机获取或模型加载失败（`Err`）时降级为仅兜底建议模式，
    /// 定时器照常运行，宿主无需区别处理。
    pub fn start(
        &mut self,
        now_ms: i64,
        camera: Result<Box<dyn CameraStream>, TrackerError>,
    ) {
        if self.running {
            self.stop();
        }

        let camera = match camera {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!(user = %self.user_id, error = %err, "starting in degraded mode");
                None
            }
        };

        info!(user = %self.user_id, with_camera = camera.is_some(), "tracking session started");
        self.camera = camera;
        self.running = true;
        self.session_start_ms = Some(now_ms);

        self.scheduler.arm_repeating(
            TimerId::EmotionTick,
            now_ms,
            self.config.emotion.analysis_interval_ms,
        );
        self.scheduler.arm_oneshot(
            TimerId::FallbackSuggestion,
            now_ms + self.config.suggestion.fallback_delay_ms,
        );
        self.scheduler.arm_oneshot(
            TimerId::BackupSuggestion,
            now_ms + self.config.suggestion.backup_delay_ms,
        );
        self.scheduler.arm_oneshot(
            TimerId::FinalBackupSuggestion,
            now_ms + self.config.suggestion.final_backup_delay_ms,
        );

        self.flags.camera_active = self.camera.is_some();
        self.persist_flags();
    }

    /// 停止追踪：清空所有定时器并释放相机流
    pub fn stop(&mut self) {
        if !self.running && self.camera.is_none() {
            return;
        }
        info!(user = %self.user_id, "tracking session stopped");
        self.scheduler.clear();
        self.release_camera();
        self.running = false;
        self.session_start_ms = None;
        self.flags.camera_active = false;
        self.persist_flags();
    }

    /// 推进逻辑时钟。`observation` 为本节拍的检测结果（没有新帧则传 `None`），
    /// 返回按固定顺序排列的宿主命令。
    pub fn advance(
        &mut self,
        now_ms: i64,
        observation: Option<FrameObservation>,
    ) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }

        if let Some(observation) = observation {
            self.process_frame(now_ms, observation, &mut events);
        }

        for timer in self.scheduler.due(now_ms) {
            match timer {
                TimerId::ClosureDeadline => self.on_closure_deadline(&mut events),
                TimerId::CountdownTick => {
                    if self.closure.countdown_visible() {
                        events.push(TrackerEvent::EyesClosed {
                            remaining_secs: self.closure.remaining_secs(now_ms),
                        });
                    }
                }
                TimerId::EmotionTick => self.on_emotion_tick(now_ms, &mut events),
                TimerId::SuggestionExpiry => events.push(TrackerEvent::SuggestionExpired),
                TimerId::FallbackSuggestion
                | TimerId::BackupSuggestion
                | TimerId::FinalBackupSuggestion => {
                    if let Some(payload) = self.suggestion.try_fallback_suggestion(now_ms) {
                        self.fire_suggestion(payload, now_ms, &mut events);
                    }
                }
            }
        }

        events
    }

    /// 用户主动触发标定
    pub fn calibrate_now(&mut self) -> Option<f64> {
        self.threshold.calibrate(&self.calibration_history)
    }

    fn process_frame(
        &mut self,
        now_ms: i64,
        observation: FrameObservation,
        events: &mut Vec<TrackerEvent>,
    ) {
        let signal = match observation {
            FrameObservation::Face(face) => self.process_face(now_ms, &face, events),
            FrameObservation::NoFace => EyeSignal::Dropout,
            FrameObservation::Error(message) => {
                let err = TrackerError::Detection(message);
                warn!(user = %self.user_id, error = %err, "frame detection failed");
                self.consecutive_failures += 1;
                if self.consecutive_failures > self.config.closure.failure_hint_threshold
                    && !self.hint_shown
                {
                    self.hint_shown = true;
                    events.push(TrackerEvent::DetectionHint(NotificationPayload {
                        title: "检测不稳定".to_string(),
                        message: "连续多帧识别失败，请调整光线或摄像头位置。".to_string(),
                    }));
                }
                EyeSignal::Dropout
            }
        };

        match self.closure.on_signal(signal, now_ms) {
            ClosureTransition::StartedTiming => {
                debug!(user = %self.user_id, "eyes closed, timing started");
                self.scheduler.arm_oneshot(
                    TimerId::ClosureDeadline,
                    now_ms + self.config.closure.closure_duration_ms,
                );
                self.scheduler.arm_repeating(
                    TimerId::CountdownTick,
                    now_ms,
                    self.config.closure.countdown_interval_ms,
                );
                events.push(TrackerEvent::EyesClosed {
                    remaining_secs: self.closure.remaining_secs(now_ms),
                });
            }
            ClosureTransition::Cancelled => {
                self.scheduler.cancel(TimerId::ClosureDeadline);
                self.scheduler.cancel(TimerId::CountdownTick);
            }
            ClosureTransition::Reopened => {
                events.push(TrackerEvent::ResumeHost);
            }
            _ => {}
        }
    }

    fn process_face(
        &mut self,
        now_ms: i64,
        face: &FaceObservation,
        events: &mut Vec<TrackerEvent>,
    ) -> EyeSignal {
        self.consecutive_failures = 0;

        let raw_ear = average_ear(&face.left_eye, &face.right_eye);
        let smoothed = self.smoother.update(raw_ear);

        self.calibration_history.push(raw_ear);
        if self.calibration_history.len() > CALIBRATION_HISTORY_CAP {
            self.calibration_history.remove(0);
        }

        self.threshold.update_from_geometry(&face.bbox);
        self.maybe_auto_calibrate(now_ms, events);

        let is_closed = smoothed < self.threshold.current();
        self.perclos.update(is_closed, now_ms);
        self.blink.update(is_closed, now_ms);
        self.emotion.observe(&face.emotions);

        if is_closed {
            EyeSignal::Closed
        } else {
            EyeSignal::Open
        }
    }

    /// 预热期结束后自动尝试一次标定
    fn maybe_auto_calibrate(&mut self, now_ms: i64, events: &mut Vec<TrackerEvent>) {
        if self.calibration_attempted || self.threshold.is_calibrated() {
            return;
        }
        let Some(start) = self.session_start_ms else {
            return;
        };
        if now_ms - start < self.config.threshold.warmup_ms {
            return;
        }
        if self.calibration_history.len() < self.config.threshold.min_calibration_samples {
            return;
        }

        self.calibration_attempted = true;
        if let Some(applied) = self.threshold.calibrate(&self.calibration_history) {
            info!(user = %self.user_id, threshold = applied, "auto calibration applied");
            events.push(TrackerEvent::CalibrationApplied { threshold: applied });
        }
    }

    fn on_closure_deadline(&mut self, events: &mut Vec<TrackerEvent>) {
        match self.closure.on_deadline() {
            ClosureTransition::Notified => {
                info!(user = %self.user_id, "sustained eye closure, break notification");
                self.scheduler.cancel(TimerId::CountdownTick);
                self.flags.closure_notified = true;
                self.persist_flags();

                events.push(TrackerEvent::PauseHost);
                events.push(TrackerEvent::BreakNotification(NotificationPayload {
                    title: "该休息了".to_string(),
                    message: "你的眼睛已经闭合了一段时间，先休息一下吧。".to_string(),
                }));
                events.push(TrackerEvent::OpenMoodSurvey);
            }
            ClosureTransition::AlreadyNotified => {
                self.scheduler.cancel(TimerId::CountdownTick);
            }
            _ => {}
        }
    }

    fn on_emotion_tick(&mut self, now_ms: i64, events: &mut Vec<TrackerEvent>) {
        let Some(dominant) = self.emotion.analyze() else {
            return;
        };

        let label = dominant.emotion.as_str().to_string();
        if self.flags.dominant_emotion.as_deref() != Some(&label) {
            self.flags.dominant_emotion = Some(label);
            self.flags.dominant_strength = Some(dominant.strength);
            self.persist_flags();
        }

        if let Some(payload) = self.suggestion.try_emotion_suggestion(&dominant, now_ms) {
            self.fire_suggestion(payload, now_ms, events);
        }
    }

    fn fire_suggestion(
        &mut self,
        payload: SuggestionPayload,
        now_ms: i64,
        events: &mut Vec<TrackerEvent>,
    ) {
        info!(user = %self.user_id, category = payload.category.as_str(), "suggestion fired");
        self.flags.suggestion_shown = true;
        self.flags.last_suggestion_ts = Some(now_ms);
        self.persist_flags();

        self.scheduler.arm_oneshot(
            TimerId::SuggestionExpiry,
            now_ms + self.config.suggestion.visible_ms,
        );
        events.push(TrackerEvent::ShowSuggestion(payload));
    }

    fn persist_flags(&mut self) {
        save_flags(self.store.as_mut(), &self.user_id, &self.flags);
    }

    fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.release_camera();
    }
}

/// 多线程宿主共享会话的方式：所有访问经由互斥锁串行化
pub type SharedSession = Arc<Mutex<TrackingSession>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeCamera {
        released: Arc<AtomicBool>,
    }

    impl CameraStream for FakeCamera {
        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn session() -> TrackingSession {
        TrackingSession::with_seed(
            TrackerConfig::default(),
            Box::new(MemoryStore::new()),
            "u1",
            Some(1),
        )
    }

    #[test]
    fn test_camera_released_on_stop() {
        let released = Arc::new(AtomicBool::new(false));
        let mut session = session();
        session.start(
            0,
            Ok(Box::new(FakeCamera {
                released: Arc::clone(&released),
            })),
        );
        session.stop();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_camera_released_on_drop() {
        let released = Arc::new(AtomicBool::new(false));
        {
            let mut session = session();
            session.start(
                0,
                Ok(Box::new(FakeCamera {
                    released: Arc::clone(&released),
                })),
            );
        }
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_restart_tears_down_previous_stream() {
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));
        let mut session = session();
        session.start(
            0,
            Ok(Box::new(FakeCamera {
                released: Arc::clone(&first),
            })),
        );
        session.start(
            1_000,
            Ok(Box::new(FakeCamera {
                released: Arc::clone(&second),
            })),
        );
        assert!(first.load(Ordering::SeqCst));
        assert!(!second.load(Ordering::SeqCst));
    }

    #[test]
    fn test_camera_error_degrades_but_keeps_running() {
        let mut session = session();
        session.start(0, Err(TrackerError::CameraAccessDenied));
        assert!(session.is_running());

        // 降级模式下兜底建议照常触发
        let mut events = Vec::new();
        for i in 0..=16 {
            events.extend(session.advance(i * 1_000, None));
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, TrackerEvent::ShowSuggestion(_))));
    }

    #[test]
    fn test_not_running_yields_no_events() {
        let mut session = session();
        assert!(session.advance(0, Some(FrameObservation::NoFace)).is_empty());
    }

    #[test]
    fn test_detection_hint_fires_once() {
        let mut session = session();
        session.start(0, Err(TrackerError::CameraUnavailable));
        let mut hints = 0;
        for i in 0..30 {
            let events = session.advance(
                i * 100,
                Some(FrameObservation::Error("model error".to_string())),
            );
            hints += events
                .iter()
                .filter(|e| matches!(e, TrackerEvent::DetectionHint(_)))
                .count();
        }
        assert_eq!(hints, 1);
    }
}
