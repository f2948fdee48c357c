//! 闭眼状态机
//!
//! 原型实现用一堆布尔标记和 ref 表达这一逻辑，这里收敛为显式有限状态机：
//! `Open` → `ClosedTiming`（闭眼计时中）→ `ClosedNotified`（本会话已提醒）。
//! 提醒在一个会话内至多触发一次，由内存标志与持久化标志共同保证。
//!
//! 检测器瞬时失联（掉帧）不会取消进行中的闭眼计时，只暂停倒计时展示：
//! 检测本身不可靠，而行为目标（识别真正的长时间闭眼）必须对掉帧鲁棒。

use crate::config::ClosureParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeState {
    Open,
    ClosedTiming,
    ClosedNotified,
}

/// 每帧由平滑 EAR 与当前阈值比较得出的信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeSignal {
    Open,
    Closed,
    /// 本帧未检测到人脸
    Dropout,
}

/// 状态机对会话层的指示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureTransition {
    None,
    /// 进入计时：需要注册截止定时器与倒计时刷新
    StartedTiming,
    /// 截止前睁眼：取消两个定时器
    Cancelled,
    /// 截止到期且本会话未提醒过：触发提醒流程
    Notified,
    /// 截止到期但已提醒过：静默进入 ClosedNotified
    AlreadyNotified,
    /// 提醒后睁眼：恢复宿主活动
    Reopened,
}

#[derive(Debug, Clone)]
pub struct ClosureStateMachine {
    params: ClosureParams,
    state: EyeState,
    closed_since: Option<i64>,
    notified_this_session: bool,
    /// 最近一帧是否成功检测到人脸，掉帧时暂停倒计时展示
    detection_live: bool,
}

impl ClosureStateMachine {
    pub fn new(params: ClosureParams) -> Self {
        Self {
            params,
            state: EyeState::Open,
            closed_since: None,
            notified_this_session: false,
            detection_live: false,
        }
    }

    pub fn state(&self) -> EyeState {
        self.state
    }

    pub fn notified(&self) -> bool {
        self.notified_this_session
    }

    /// 从持久化标志恢复（同一逻辑会话内的页面重载）
    pub fn restore_notified(&mut self, notified: bool) {
        self.notified_this_session = notified;
    }

    pub fn closed_since(&self) -> Option<i64> {
        self.closed_since
    }

    /// 倒计时展示是否应该刷新：计时中且检测未掉线
    pub fn countdown_visible(&self) -> bool {
        self.state == EyeState::ClosedTiming && self.detection_live
    }

    pub fn remaining_secs(&self, now_ms: i64) -> u32 {
        match self.closed_since {
            Some(since) => {
                let remaining = self.params.closure_duration_ms - (now_ms - since);
                (remaining.max(0) as f64 / 1_000.0).ceil() as u32
            }
            None => 0,
        }
    }

    /// 每个检测节拍喂入一次信号
    pub fn on_signal(&mut self, signal: EyeSignal, now_ms: i64) -> ClosureTransition {
        self.detection_live = signal != EyeSignal::Dropout;

        match (self.state, signal) {
            (EyeState::Open, EyeSignal::Closed) => {
                self.state = EyeState::ClosedTiming;
                self.closed_since = Some(now_ms);
                ClosureTransition::StartedTiming
            }
            (EyeState::ClosedTiming, EyeSignal::Open) => {
                self.state = EyeState::Open;
                self.closed_since = None;
                ClosureTransition::Cancelled
            }
            (EyeState::ClosedNotified, EyeSignal::Open) => {
                self.state = EyeState::Open;
                self.closed_since = None;
                ClosureTransition::Reopened
            }
            // 掉帧不取消计时，闭眼持续也不产生新指示
            _ => ClosureTransition::None,
        }
    }

    /// 截止定时器到期时调用。只有仍在计时（含掉帧期间）才生效。
    pub fn on_deadline(&mut self) -> ClosureTransition {
        if self.state != EyeState::ClosedTiming {
            return ClosureTransition::None;
        }

        self.state = EyeState::ClosedNotified;
        if self.notified_this_session {
            ClosureTransition::AlreadyNotified
        } else {
            self.notified_this_session = true;
            ClosureTransition::Notified
        }
    }

    pub fn reset(&mut self) {
        self.state = EyeState::Open;
        self.closed_since = None;
        self.detection_live = false;
        // notified_this_session 属于会话级标志，由会话边界管理
    }
}
