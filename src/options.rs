//! 排序选项 - 用户可配置的排序规则
//!
//! 选项以 JSON 文件持久化，文件中只需包含被覆盖的字段，缺失字段使用默认值。
//! 读取失败时回退到默认值，不向用户报错。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::bookmarks::BOOKMARK_BAR_NODE_ID;
use crate::error::StoreError;
use crate::messages::{MessageBus, RuntimeMessage};

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// 书签（叶子节点）的比较策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompareBy {
    /// 按标题
    Title,
    /// 按完整 URL 字符串
    #[default]
    Url,
    /// 按服务（协议、注册域名、反转子域名、端口、路径）
    UrlSimple,
}

/// 文件夹相对书签的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FolderPlacement {
    #[default]
    Top,
    Bottom,
}

/// 扩展选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionOptions {
    /// 书签树变化时自动排序
    pub auto: bool,
    pub order: SortOrder,
    pub compare_by: CompareBy,
    pub folder_placement: FolderPlacement,
    /// 不重排其直接子节点的文件夹 id（其子孙仍然排序）
    pub folder_ignore: BTreeSet<String>,
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        Self {
            auto: false,
            order: SortOrder::Asc,
            compare_by: CompareBy::Url,
            folder_placement: FolderPlacement::Top,
            folder_ignore: BTreeSet::from([BOOKMARK_BAR_NODE_ID.to_string()]),
        }
    }
}

impl ExtensionOptions {
    pub fn is_ignored(&self, folder_id: &str) -> bool {
        self.folder_ignore.contains(folder_id)
    }

    /// 一行描述，用于日志
    pub fn description(&self) -> String {
        format!(
            "compare_by={:?} order={:?} folders={:?} auto={} ignored={}",
            self.compare_by,
            self.order,
            self.folder_placement,
            self.auto,
            self.folder_ignore.len()
        )
    }
}

/// 选项存储
#[async_trait]
pub trait OptionsStore: Send + Sync {
    /// 默认值合并持久化的覆盖值
    async fn read_options(&self) -> ExtensionOptions;
    async fn write_options(&self, options: &ExtensionOptions) -> Result<(), StoreError>;
}

/// JSON 文件选项存储
pub struct JsonOptionsStore {
    path: PathBuf,
    bus: Option<MessageBus>,
}

impl JsonOptionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bus: None,
        }
    }

    /// 写入成功后在 `bus` 上广播 `saved`
    pub fn with_bus(mut self, bus: MessageBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 默认路径: `$HOME/.config/bookmark-auto-sort/options.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("bookmark-auto-sort")
            .join("options.json"))
    }

    fn load(&self) -> Result<ExtensionOptions, StoreError> {
        if !self.path.exists() {
            return Ok(ExtensionOptions::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let options: ExtensionOptions = serde_json::from_str(&content)?;
        Ok(options)
    }
}

#[async_trait]
impl OptionsStore for JsonOptionsStore {
    async fn read_options(&self) -> ExtensionOptions {
        match self.load() {
            Ok(options) => {
                debug!("Loaded options from {:?}: {}", self.path, options.description());
                options
            }
            Err(e) => {
                warn!("⚠️  Failed to read options from {:?}, using defaults: {}", self.path, e);
                ExtensionOptions::default()
            }
        }
    }

    async fn write_options(&self, options: &ExtensionOptions) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(options)?;
        // 先写临时文件再重命名，监听方不会读到写了一半的文件
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Saved options to {:?}", self.path);

        if let Some(bus) = &self.bus {
            bus.publish(RuntimeMessage::Saved);
        }
        Ok(())
    }
}

/// 内存选项存储（测试与嵌入使用）
#[derive(Default)]
pub struct MemoryOptionsStore {
    options: std::sync::Mutex<ExtensionOptions>,
}

impl MemoryOptionsStore {
    pub fn new(options: ExtensionOptions) -> Self {
        Self {
            options: std::sync::Mutex::new(options),
        }
    }
}

#[async_trait]
impl OptionsStore for MemoryOptionsStore {
    async fn read_options(&self) -> ExtensionOptions {
        match self.options.lock() {
            Ok(options) => options.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn write_options(&self, options: &ExtensionOptions) -> Result<(), StoreError> {
        match self.options.lock() {
            Ok(mut current) => *current = options.clone(),
            Err(poisoned) => *poisoned.into_inner() = options.clone(),
        }
        Ok(())
    }
}
