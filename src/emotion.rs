//! 表情聚合
//!
//! 每个检测节拍把分类器输出与上一状态做加权混合（默认 85% 新 / 15% 旧），
//! 对最大分量做增强后存入有界历史。分析节拍（默认 1 Hz）对历史求平均得到
//! 主导表情，再在主导表情的滚动历史中找出现最频繁的标签，
//! 平局时取平均概率更高者。

use std::collections::VecDeque;

use crate::config::EmotionParams;
use crate::types::{Emotion, EmotionScores};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantEmotion {
    pub emotion: Emotion,
    /// 该标签在历史均值中的概率
    pub strength: f64,
}

#[derive(Debug, Clone)]
pub struct EmotionAggregator {
    params: EmotionParams,
    state: EmotionScores,
    history: VecDeque<EmotionScores>,
    dominant_history: VecDeque<Emotion>,
}

impl EmotionAggregator {
    pub fn new(params: EmotionParams) -> Self {
        let history_cap = params.history_len;
        let dominant_cap = params.dominant_history_len;
        Self {
            params,
            state: EmotionScores::default(),
            history: VecDeque::with_capacity(history_cap),
            dominant_history: VecDeque::with_capacity(dominant_cap),
        }
    }

    pub fn current(&self) -> &EmotionScores {
        &self.state
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// 喂入一帧分类器输出
    pub fn observe(&mut self, observed: &EmotionScores) {
        let new_w = self.params.blend_new_weight;
        let old_w = 1.0 - new_w;

        let mut blended = EmotionScores::default();
        for emotion in Emotion::OBSERVABLE {
            let value = new_w * observed.get(emotion) + old_w * self.state.get(emotion);
            blended.set(emotion, value);
        }

        // 增强最大分量，拉开与其余标签的差距
        let (dominant, peak) = blended.dominant();
        blended.set(dominant, peak * self.params.boost_factor);

        self.state = blended;
        self.history.push_back(blended);
        if self.history.len() > self.params.history_len {
            self.history.pop_front();
        }
    }

    /// 分析节拍：历史均值的主导表情进入滚动历史，
    /// 返回其中最频繁的主导表情及其均值概率。
    /// 历史为空或从未观测到任何非零概率时返回 None。
    pub fn analyze(&mut self) -> Option<DominantEmotion> {
        if self.history.is_empty() {
            return None;
        }

        let averages = self.average_scores();
        let (tick_dominant, peak) = averages.dominant();
        // 全零概率说明从未观测到任何表情信号，没有可用的主导表情
        if peak <= 0.0 {
            return None;
        }

        self.dominant_history.push_back(tick_dominant);
        if self.dominant_history.len() > self.params.dominant_history_len {
            self.dominant_history.pop_front();
        }

        let mut best: Option<(Emotion, usize, f64)> = None;
        for emotion in Emotion::OBSERVABLE {
            let count = self
                .dominant_history
                .iter()
                .filter(|&&e| e == emotion)
                .count();
            if count == 0 {
                continue;
            }
            let strength = averages.get(emotion);
            let better = match best {
                None => true,
                Some((_, best_count, best_strength)) => {
                    count > best_count || (count == best_count && strength > best_strength)
                }
            };
            if better {
                best = Some((emotion, count, strength));
            }
        }

        best.map(|(emotion, _, strength)| DominantEmotion { emotion, strength })
    }

    fn average_scores(&self) -> EmotionScores {
        let mut averages = EmotionScores::default();
        let n = self.history.len() as f64;
        for emotion in Emotion::OBSERVABLE {
            let sum: f64 = self.history.iter().map(|s| s.get(emotion)).sum();
            averages.set(emotion, sum / n);
        }
        averages
    }

    pub fn reset(&mut self) {
        self.state = EmotionScores::default();
        self.history.clear();
        self.dominant_history.clear();
    }
}

impl Default for EmotionAggregator {
    fn default() -> Self {
        Self::new(EmotionParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(emotion: Emotion, p: f64) -> EmotionScores {
        let mut s = EmotionScores::default();
        s.set(emotion, p);
        s
    }

    #[test]
    fn test_blend_weights_recent_observation() {
        let mut agg = EmotionAggregator::default();
        agg.observe(&scores(Emotion::Happy, 0.8));
        // 85% * 0.8 = 0.68，再乘以增强系数
        assert!(agg.current().get(Emotion::Happy) > 0.68);
    }

    #[test]
    fn test_history_bounded() {
        let mut agg = EmotionAggregator::default();
        for _ in 0..100 {
            agg.observe(&scores(Emotion::Sad, 0.5));
        }
        assert_eq!(agg.history_len(), EmotionParams::default().history_len);
    }

    #[test]
    fn test_analyze_empty_history() {
        let mut agg = EmotionAggregator::default();
        assert!(agg.analyze().is_none());
    }

    #[test]
    fn test_zero_scores_have_no_dominant() {
        let mut agg = EmotionAggregator::default();
        for _ in 0..5 {
            agg.observe(&EmotionScores::default());
        }
        assert!(agg.analyze().is_none());
    }

    #[test]
    fn test_dominant_emotion_detected() {
        let mut agg = EmotionAggregator::default();
        for _ in 0..10 {
            agg.observe(&scores(Emotion::Sad, 0.7));
        }
        let dominant = agg.analyze().unwrap();
        assert_eq!(dominant.emotion, Emotion::Sad);
        assert!(dominant.strength > 0.25);
    }

    #[test]
    fn test_most_frequent_dominant_wins() {
        let mut agg = EmotionAggregator::default();
        // 先积累多个 Happy 主导的分析节拍
        for _ in 0..5 {
            agg.observe(&scores(Emotion::Happy, 0.9));
            agg.analyze();
        }
        // 短暂的 Sad 峰值不应立即翻转最频繁主导
        agg.observe(&scores(Emotion::Sad, 0.95));
        let dominant = agg.analyze().unwrap();
        assert_eq!(dominant.emotion, Emotion::Happy);
    }
}
