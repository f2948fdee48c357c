//! 逻辑时钟定时器调度
//!
//! 原型实现里有五处相互独立的 `setInterval`/`setTimeout` 调用点，
//! 这里统一收敛到一个协作式调度器：宿主按任意节奏推进逻辑时钟，
//! 到期的定时器按固定顺序派发，便于用合成时间做确定性测试。

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// 闭眼持续时长的一次性截止
    ClosureDeadline,
    /// 1 Hz 的倒计时展示刷新
    CountdownTick,
    /// 周期性的表情聚合分析
    EmotionTick,
    /// 可见建议的自动过期
    SuggestionExpiry,
    /// 基于时间的兜底建议
    FallbackSuggestion,
    /// 兜底的备份
    BackupSuggestion,
    /// 最后一道备份，兜住前两次都被冷却拦下的情况
    FinalBackupSuggestion,
}

impl TimerId {
    /// 同一时刻到期时的派发顺序：闭眼相关优先于表情与建议
    fn dispatch_order(&self) -> u8 {
        match self {
            Self::ClosureDeadline => 0,
            Self::CountdownTick => 1,
            Self::EmotionTick => 2,
            Self::SuggestionExpiry => 3,
            Self::FallbackSuggestion => 4,
            Self::BackupSuggestion => 5,
            Self::FinalBackupSuggestion => 6,
        }
    }
}

#[derive(Debug, Clone)]
struct TimerEntry {
    id: TimerId,
    deadline_ms: i64,
    interval_ms: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    timers: Vec<TimerEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一次性定时器，同名定时器被替换
    pub fn arm_oneshot(&mut self, id: TimerId, deadline_ms: i64) {
        self.cancel(id);
        self.timers.push(TimerEntry {
            id,
            deadline_ms,
            interval_ms: None,
        });
    }

    /// 注册周期定时器，首次在 `now_ms + interval_ms` 到期
    pub fn arm_repeating(&mut self, id: TimerId, now_ms: i64, interval_ms: i64) {
        self.cancel(id);
        self.timers.push(TimerEntry {
            id,
            deadline_ms: now_ms + interval_ms,
            interval_ms: Some(interval_ms),
        });
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<i64> {
        self.timers.iter().find(|t| t.id == id).map(|t| t.deadline_ms)
    }

    /// 取出所有到期定时器。周期定时器合并错过的节拍后重新排期，
    /// 一次性定时器到期即移除。返回顺序固定：先按到期时间，再按派发优先级。
    pub fn due(&mut self, now_ms: i64) -> Vec<TimerId> {
        let mut fired: Vec<(i64, TimerId)> = Vec::new();

        self.timers.retain_mut(|timer| {
            if timer.deadline_ms > now_ms {
                return true;
            }
            fired.push((timer.deadline_ms, timer.id));
            match timer.interval_ms {
                Some(interval) => {
                    // 合并错过的节拍，只触发一次
                    while timer.deadline_ms <= now_ms {
                        timer.deadline_ms += interval;
                    }
                    true
                }
                None => false,
            }
        });

        fired.sort_by_key(|(deadline, id)| (*deadline, id.dispatch_order()));
        fired.into_iter().map(|(_, id)| id).collect()
    }

    /// 停止追踪时清空所有定时器
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oneshot_fires_once() {
        let mut scheduler = Scheduler::new();
        scheduler.arm_oneshot(TimerId::ClosureDeadline, 3_000);
        assert!(scheduler.due(2_999).is_empty());
        assert_eq!(scheduler.due(3_000), vec![TimerId::ClosureDeadline]);
        assert!(scheduler.due(10_000).is_empty());
    }

    #[test]
    fn test_repeating_rearms() {
        let mut scheduler = Scheduler::new();
        scheduler.arm_repeating(TimerId::EmotionTick, 0, 1_000);
        assert_eq!(scheduler.due(1_000), vec![TimerId::EmotionTick]);
        assert_eq!(scheduler.due(2_000), vec![TimerId::EmotionTick]);
    }

    #[test]
    fn test_repeating_coalesces_missed_ticks() {
        let mut scheduler = Scheduler::new();
        scheduler.arm_repeating(TimerId::EmotionTick, 0, 1_000);
        // 跳过多个节拍，只触发一次，然后正常续排
        assert_eq!(scheduler.due(5_500), vec![TimerId::EmotionTick]);
        assert!(scheduler.due(5_900).is_empty());
        assert_eq!(scheduler.due(6_000), vec![TimerId::EmotionTick]);
    }

    #[test]
    fn test_fixed_dispatch_order() {
        let mut scheduler = Scheduler::new();
        scheduler.arm_oneshot(TimerId::FallbackSuggestion, 1_000);
        scheduler.arm_oneshot(TimerId::ClosureDeadline, 1_000);
        scheduler.arm_oneshot(TimerId::SuggestionExpiry, 1_000);
        assert_eq!(
            scheduler.due(1_000),
            vec![
                TimerId::ClosureDeadline,
                TimerId::SuggestionExpiry,
                TimerId::FallbackSuggestion,
            ]
        );
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut scheduler = Scheduler::new();
        scheduler.arm_oneshot(TimerId::ClosureDeadline, 100);
        scheduler.arm_repeating(TimerId::CountdownTick, 0, 1_000);
        scheduler.cancel(TimerId::ClosureDeadline);
        assert!(!scheduler.is_armed(TimerId::ClosureDeadline));
        scheduler.clear();
        assert!(scheduler.due(i64::MAX).is_empty());
    }
}
