//! 资源文本抽取编排
//!
//! 逐阶段处理三类资源：歌词、剧情（含主界面对话和实况文本）、图集。
//! 阶段之间串行，阶段内部的条目通过批处理池并行。

pub mod atlas;
pub mod lyrics;
pub mod paths;
pub mod story;

use crate::config::WorkspaceConfig;
use crate::reader::AssetReader;
use crate::store::{AssetCatalog, AssetRow};
use crate::utils::{load_json, TlError};
use serde_json::Value;

/// 剧情类资源的清单查询模式（命名约定由游戏客户端决定）
pub const STORY_PATTERNS: [&str; 3] = [
    "story/data/__/____/storytimeline%",
    "home/data/_____/__/hometimeline%",
    "race/storyrace/text/%",
];

/// 歌词资源的清单查询模式
pub const LYRICS_PATTERN: &str = "live/%lyrics";

/// 图集贴图的清单查询模式
pub const ATLAS_PATTERN: &str = "atlas/%_tex";

/// 单个条目的抽取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStatus {
    /// 已写入编辑文件
    Written,
    /// 本地没有对应内容，跳过
    SkippedMissing,
}

/// 单个资源文件的抽取决策
#[derive(Debug, Clone)]
pub struct ExtractPlan {
    pub row: AssetRow,
    /// 是否需要重新抽取
    pub needs_update: bool,
    /// 是否是首次抽取（否则替换前要先备份旧文件）
    pub is_new: bool,
}

/// 判断一个资源文件是否需要抽取
///
/// 没有编辑文件 ⇒ 首次抽取；已有文件且存储的哈希与清单一致 ⇒
/// 不需要动；哈希不一致 ⇒ 需要重抽且不是首次。
pub fn plan_for_row(cfg: &WorkspaceConfig, row: &AssetRow) -> Result<ExtractPlan, TlError> {
    let (_, rel) = paths::relative_document_path(&row.file_name)?;
    let editing_path = cfg.assets_editing_dir.join(rel);

    let mut plan = ExtractPlan {
        row: row.clone(),
        needs_update: true,
        is_new: true,
    };

    if editing_path.exists() {
        let existing: Value = load_json(&editing_path)?;
        if existing.get("hash").and_then(|h| h.as_str()) == Some(row.hash.as_str()) {
            plan.needs_update = false;
        } else {
            plan.is_new = false;
        }
    }

    Ok(plan)
}

/// 索引所有资源：歌词 → 剧情 → 图集
pub fn index_assets(
    cfg: &WorkspaceConfig,
    catalog: &dyn AssetCatalog,
    reader: &dyn AssetReader,
) -> Result<(), TlError> {
    println!("=== 索引资源 ===");
    lyrics::index_lyrics(cfg, catalog, reader)?;
    story::index_stories(cfg, catalog, reader)?;
    atlas::index_atlas(cfg, catalog, reader)?;
    Ok(())
}

// 字段树访问辅助：缺字段或类型不符都算条目级的文档错误

pub(crate) fn field_str<'a>(tree: &'a Value, field: &str) -> Result<&'a str, TlError> {
    tree.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| TlError::MalformedDocument(format!("missing string field: {}", field)))
}

pub(crate) fn field_i64(tree: &Value, field: &str) -> Result<i64, TlError> {
    tree.get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| TlError::MalformedDocument(format!("missing integer field: {}", field)))
}

pub(crate) fn field_array<'a>(tree: &'a Value, field: &str) -> Result<&'a Vec<Value>, TlError> {
    tree.get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TlError::MalformedDocument(format!("missing array field: {}", field)))
}
