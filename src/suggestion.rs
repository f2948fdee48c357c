//! 内容建议引擎
//!
//! 把主导表情映射到建议分类（游戏 / 视频 / 测验），在冷却与
//! 会话一次性门控都满足时向宿主派发建议。表情数据缺失时，
//! 基于时间的兜底路径独立触发，两条路径共享同一份持久化门控。

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SuggestionParams;
use crate::emotion::DominantEmotion;
use crate::types::{Emotion, SuggestionCategory, SuggestionPayload};

#[derive(Debug)]
pub struct SuggestionEngine {
    params: SuggestionParams,
    rng: ChaCha8Rng,
    shown_this_session: bool,
    last_suggestion_ts: Option<i64>,
}

impl SuggestionEngine {
    pub fn new(params: SuggestionParams) -> Self {
        Self::with_seed(params, None)
    }

    /// 测试时传入固定种子获得确定性的 neutral 分支
    pub fn with_seed(params: SuggestionParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            params,
            rng,
            shown_this_session: false,
            last_suggestion_ts: None,
        }
    }

    /// 从持久化标志恢复门控状态
    pub fn restore(&mut self, shown_this_session: bool, last_suggestion_ts: Option<i64>) {
        self.shown_this_session = shown_this_session;
        self.last_suggestion_ts = last_suggestion_ts;
    }

    pub fn shown_this_session(&self) -> bool {
        self.shown_this_session
    }

    pub fn last_suggestion_ts(&self) -> Option<i64> {
        self.last_suggestion_ts
    }

    /// 会话边界：清除会话内一次性标志，冷却时间戳保留
    pub fn begin_session(&mut self) {
        self.shown_this_session = false;
    }

    /// 冷却已过且本会话尚未展示过
    pub fn can_fire(&self, now_ms: i64) -> bool {
        if self.shown_this_session {
            return false;
        }
        match self.last_suggestion_ts {
            Some(last) => now_ms - last >= self.params.cooldown_ms,
            None => true,
        }
    }

    /// 表情路径：主导表情强度达标且门控通过时触发
    pub fn try_emotion_suggestion(
        &mut self,
        dominant: &DominantEmotion,
        now_ms: i64,
    ) -> Option<SuggestionPayload> {
        if dominant.strength <= self.params.strength_threshold || !self.can_fire(now_ms) {
            return None;
        }
        let category = self.map_category(dominant.emotion);
        Some(self.fire(category, now_ms))
    }

    /// 时间兜底路径：不依赖任何表情数据
    pub fn try_fallback_suggestion(&mut self, now_ms: i64) -> Option<SuggestionPayload> {
        if !self.can_fire(now_ms) {
            return None;
        }
        Some(self.fire(SuggestionCategory::Video, now_ms))
    }

    /// 表情到建议分类的映射。除 neutral 的随机分支外完全确定。
    /// bored 由外部分类器之外的路径保留，当前不可达。
    pub fn map_category(&mut self, emotion: Emotion) -> SuggestionCategory {
        match emotion {
            Emotion::Sad | Emotion::Fearful | Emotion::Disgusted => SuggestionCategory::Game,
            Emotion::Happy => SuggestionCategory::Video,
            Emotion::Neutral => {
                if self.rng.gen_bool(0.5) {
                    SuggestionCategory::Video
                } else {
                    SuggestionCategory::Quiz
                }
            }
            Emotion::Bored => SuggestionCategory::Quiz,
            Emotion::Surprised | Emotion::Angry => SuggestionCategory::Quiz,
        }
    }

    fn fire(&mut self, category: SuggestionCategory, now_ms: i64) -> SuggestionPayload {
        self.shown_this_session = true;
        self.last_suggestion_ts = Some(now_ms);

        let (title, message) = match category {
            SuggestionCategory::Game => (
                "换换心情",
                "来玩一个轻松的小游戏，放松一下再继续学习。",
            ),
            SuggestionCategory::Video => (
                "休息片刻",
                "看一段短视频，给眼睛和大脑一点缓冲时间。",
            ),
            SuggestionCategory::Quiz => (
                "小试身手",
                "来做一组小测验，换个节奏巩固刚学的内容。",
            ),
        };

        SuggestionPayload {
            category,
            title: title.to_string(),
            message: message.to_string(),
            action: category.action().to_string(),
        }
    }
}
