//! 持久化状态
//!
//! 原型实现把提醒/建议的门控标志散落在全局字符串键里，这里收敛为
//! 一个显式的 `PersistedFlags` 结构，经由宿主提供的 `StateStore`
//! 能力读写（浏览器存储、文件或测试用内存实现）。
//!
//! 键按用户 id 限定作用域，避免同一浏览器配置下多用户互相串扰。

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TrackerError;

/// 宿主提供的键值存储能力
pub trait StateStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// 跨页面重载存活的门控状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedFlags {
    /// 闭眼提醒是否已触发（会话内至多一次）
    pub closure_notified: bool,
    /// 本会话是否已展示过建议（页面加载时清除）
    pub suggestion_shown: bool,
    /// 上次建议的时间戳（冷却门控，页面加载时保留）
    pub last_suggestion_ts: Option<i64>,
    /// 诊断用：最近的主导表情及其强度
    pub dominant_emotion: Option<String>,
    pub dominant_strength: Option<f64>,
    /// 重载后是否自动恢复追踪
    pub camera_active: bool,
}

pub fn state_key(user_id: &str) -> String {
    format!("wellness:{user_id}:state")
}

/// 读出持久化标志。缺失或损坏（无法解析的 JSON）都回退到默认空状态。
pub fn load_flags(store: &dyn StateStore, user_id: &str) -> PersistedFlags {
    let key = state_key(user_id);
    match store.get(&key) {
        None => PersistedFlags::default(),
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(flags) => flags,
            Err(err) => {
                let err = TrackerError::Storage(err.to_string());
                warn!(%key, error = %err, "corrupt persisted state, falling back to defaults");
                PersistedFlags::default()
            }
        },
    }
}

pub fn save_flags(store: &mut dyn StateStore, user_id: &str, flags: &PersistedFlags) {
    let key = state_key(user_id);
    match serde_json::to_string(flags) {
        Ok(raw) => store.set(&key, &raw),
        Err(err) => {
            let err = TrackerError::Storage(err.to_string());
            warn!(%key, error = %err, "failed to serialize persisted state");
        }
    }
}

/// 测试与嵌入场景用的内存实现
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// 桌面宿主用的 JSON 文件实现，写穿透，读在打开时一次完成。
/// 文件损坏按缺失处理。
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: HashMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let cache = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "corrupt store file, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, cache }
    }

    fn persist(&self) {
        let raw = match serde_json::to_string_pretty(&self.cache) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "failed to serialize store");
                return;
            }
        };
        let result = std::fs::File::create(&self.path)
            .and_then(|mut file| file.write_all(raw.as_bytes()));
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "failed to write store file");
        }
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.cache.insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn remove(&mut self, key: &str) {
        self.cache.remove(key);
        self.persist();
    }
}
