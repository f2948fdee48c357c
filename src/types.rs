use serde::{Deserialize, Serialize};

/// 几何计算失败时的安全默认 EAR 值（睁眼状态的典型值）
pub const SAFE_DEFAULT_EAR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 人脸包围盒（归一化或像素坐标均可，阈值计算只用宽高比）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Neutral,
    Surprised,
    Fearful,
    Disgusted,
    /// 外部分类器不会产生该标签，仅作为建议映射中的保留分类
    Bored,
}

impl Emotion {
    /// 外部表情分类器实际产生的标签集合（不含 Bored）
    pub const OBSERVABLE: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Neutral,
        Emotion::Surprised,
        Emotion::Fearful,
        Emotion::Disgusted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Neutral => "neutral",
            Self::Surprised => "surprised",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Bored => "bored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "happy" => Some(Self::Happy),
            "sad" => Some(Self::Sad),
            "angry" => Some(Self::Angry),
            "neutral" => Some(Self::Neutral),
            "surprised" => Some(Self::Surprised),
            "fearful" => Some(Self::Fearful),
            "disgusted" => Some(Self::Disgusted),
            "bored" => Some(Self::Bored),
            _ => None,
        }
    }
}

/// 一次检测中各表情标签的概率，来自独立的外部分类器，不要求和为 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmotionScores {
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub neutral: f64,
    pub surprised: f64,
    pub fearful: f64,
    pub disgusted: f64,
}

impl EmotionScores {
    pub fn get(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Neutral => self.neutral,
            Emotion::Surprised => self.surprised,
            Emotion::Fearful => self.fearful,
            Emotion::Disgusted => self.disgusted,
            Emotion::Bored => 0.0,
        }
    }

    pub fn set(&mut self, emotion: Emotion, value: f64) {
        let slot = match emotion {
            Emotion::Happy => &mut self.happy,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Neutral => &mut self.neutral,
            Emotion::Surprised => &mut self.surprised,
            Emotion::Fearful => &mut self.fearful,
            Emotion::Disgusted => &mut self.disgusted,
            Emotion::Bored => return,
        };
        *slot = value.clamp(0.0, 1.0);
    }

    /// 当前快照中概率最高的标签及其概率
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = (Emotion::Neutral, f64::MIN);
        for emotion in Emotion::OBSERVABLE {
            let p = self.get(emotion);
            if p > best.1 {
                best = (emotion, p);
            }
        }
        best
    }
}

/// 单帧检测结果：人脸包围盒、双眼各 6 个关键点、表情概率
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    pub bbox: FaceBox,
    pub left_eye: Vec<Point2D>,
    pub right_eye: Vec<Point2D>,
    pub emotions: EmotionScores,
}

/// 外部检测器每帧提供的输入，检测器被视为不透明能力
#[derive(Debug, Clone)]
pub enum FrameObservation {
    Face(FaceObservation),
    NoFace,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Game,
    Video,
    Quiz,
}

impl SuggestionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Video => "video",
            Self::Quiz => "quiz",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Game => "/wellness/games",
            Self::Video => "/wellness/videos",
            Self::Quiz => "/quiz",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionPayload {
    pub category: SuggestionCategory,
    pub title: String,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
}

/// 会话向宿主发出的命令/事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TrackerEvent {
    /// 闭眼倒计时提示（仅展示用途）
    #[serde(rename = "EYES_CLOSED")]
    EyesClosed { remaining_secs: u32 },

    /// 暂停宿主页面活动（停止媒体、禁用滚动）
    #[serde(rename = "PAUSE_HOST")]
    PauseHost,

    #[serde(rename = "RESUME_HOST")]
    ResumeHost,

    /// 持续闭眼后的一次性休息提醒
    #[serde(rename = "BREAK_NOTIFICATION")]
    BreakNotification(NotificationPayload),

    /// 打开阻塞式心情问卷，只能通过提交关闭
    #[serde(rename = "OPEN_MOOD_SURVEY")]
    OpenMoodSurvey,

    #[serde(rename = "SHOW_SUGGESTION")]
    ShowSuggestion(SuggestionPayload),

    #[serde(rename = "SUGGESTION_EXPIRED")]
    SuggestionExpired,

    /// 连续检测失败后的一次性提示（调整光线/位置），仅建议性质
    #[serde(rename = "DETECTION_HINT")]
    DetectionHint(NotificationPayload),

    #[serde(rename = "CALIBRATION_APPLIED")]
    CalibrationApplied { threshold: f64 },
}

impl TrackerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EyesClosed { .. } => "EYES_CLOSED",
            Self::PauseHost => "PAUSE_HOST",
            Self::ResumeHost => "RESUME_HOST",
            Self::BreakNotification(_) => "BREAK_NOTIFICATION",
            Self::OpenMoodSurvey => "OPEN_MOOD_SURVEY",
            Self::ShowSuggestion(_) => "SHOW_SUGGESTION",
            Self::SuggestionExpired => "SUGGESTION_EXPIRED",
            Self::DetectionHint(_) => "DETECTION_HINT",
            Self::CalibrationApplied { .. } => "CALIBRATION_APPLIED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_emotion_round_trip() {
        for emotion in Emotion::OBSERVABLE {
            assert_eq!(Emotion::parse(emotion.as_str()), Some(emotion));
        }
        assert_eq!(Emotion::parse("bored"), Some(Emotion::Bored));
        assert_eq!(Emotion::parse("confused"), None);
    }

    #[test]
    fn test_scores_dominant() {
        let mut scores = EmotionScores::default();
        scores.set(Emotion::Sad, 0.8);
        scores.set(Emotion::Happy, 0.3);
        let (emotion, p) = scores.dominant();
        assert_eq!(emotion, Emotion::Sad);
        assert!((p - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_event_serde_tag() {
        let event = TrackerEvent::EyesClosed { remaining_secs: 2 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("EYES_CLOSED"));
        let back: TrackerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
