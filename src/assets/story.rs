//! 剧情文档的抽取与合并
//!
//! 覆盖三种文档：剧情时间线（story/）、主界面对话（home/）和
//! 实况文本（race/，单字段）。文档内的单元按位置对应：同一个
//! `(file_name, hash)` 的两次抽取中第 i 个单元指同一句话，合并
//! 依赖这一不变量，系统本身不做校验。

use crate::assets::{
    field_array, field_i64, field_str, paths, paths::AssetKind, plan_for_row, ExtractPlan,
    ExtractStatus, STORY_PATTERNS,
};
use crate::batch::run_batch;
use crate::config::WorkspaceConfig;
use crate::reader::AssetReader;
use crate::record::SCHEMA_VERSION;
use crate::store::{AssetCatalog, AssetRow};
use crate::utils::{backup_copy, backup_rename, collect_json_files, load_json, save_json, TlError};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::path::Path;

/// 一份剧情文档的编辑状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryDocument {
    pub version: u32,
    pub row_index: i64,
    pub file_name: String,
    /// 整份文档的内容哈希，作为结构性变更的检测信号
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub data: Vec<StoryUnit>,
}

/// 文档里的一个有序单元
///
/// race 文档的单元只有 `text`/`source` 两个字段，其余字段缺省。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<i64>,
    pub text: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_length: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_clip_length: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anim_data: Option<Vec<AnimEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<SubUnit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_info: Option<Vec<SubUnit>>,
}

/// 选项、染色文本等子单元
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubUnit {
    pub text: String,
    pub source: String,
}

/// 动画片段时长元数据（译文变长时需要调整的片段）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimEntry {
    pub orig_length: Number,
    pub path_id: i64,
}

/// 已发布翻译文件里的一个单元（没有 source 系字段）
#[derive(Debug, Deserialize)]
struct ShippedUnit {
    #[serde(default)]
    text: String,
    name: Option<String>,
    clip_length: Option<Number>,
    anim_data: Option<Vec<AnimEntry>>,
    choices: Option<Vec<SubUnit>>,
    color_info: Option<Vec<SubUnit>>,
}

/// 已发布翻译回填编辑文件的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// 译文已按位置拷入编辑文件
    Merged,
    /// 源内容本地已不存在，已发布文件被存为时间戳备份
    ArchivedShipped,
    /// 编辑文件JSON损坏，已隔离
    Quarantined,
    /// 哈希不一致，不做位置合并
    Stale,
}

/// 索引所有剧情类文档
pub fn index_stories(
    cfg: &WorkspaceConfig,
    catalog: &dyn AssetCatalog,
    reader: &dyn AssetReader,
) -> Result<(), TlError> {
    println!("=== 索引剧情文本 ===");

    // 先把已发布的翻译回填进编辑文件，再决定哪些文件要重抽
    let mut shipped = Vec::new();
    for sub in ["story", "home", "race"] {
        shipped.extend(collect_json_files(&cfg.assets_output_dir.join(sub))?);
    }
    println!("正在用已发布翻译回填编辑文件 ({})", shipped.len());
    let outcome = run_batch(
        shipped,
        |p| p.display().to_string(),
        |p| sync_from_shipped(cfg, reader, p),
    );
    outcome.report_failures();

    let rows = catalog.list(&STORY_PATTERNS)?;
    if rows.is_empty() {
        return Err(TlError::EmptyCatalog("story".to_string()));
    }
    println!("找到 {} 条剧情资源记录", rows.len());

    println!("正在检查哪些文件需要抽取");
    let plans = run_batch(rows, |r| r.file_name.clone(), |r| plan_for_row(cfg, r));
    plans.report_failures();

    let to_update: Vec<ExtractPlan> = plans
        .results
        .into_iter()
        .filter(|p| p.needs_update)
        .collect();
    println!("正在抽取 {} 个文件", to_update.len());

    let outcome = run_batch(
        to_update,
        |p| p.row.file_name.clone(),
        |p| extract_document(cfg, reader, &p.row, p.is_new),
    );
    outcome.report_failures();
    println!("抽取完成 {} 个文件", outcome.ok_count());

    Ok(())
}

/// 抽取一份文档并写入编辑文件
///
/// 本地没有对应内容时跳过（内容分发是带外的，可能滞后）。
/// 非首次抽取时先把旧文件重命名为时间戳备份，再写新文件。
pub fn extract_document(
    cfg: &WorkspaceConfig,
    reader: &dyn AssetReader,
    row: &AssetRow,
    is_new: bool,
) -> Result<ExtractStatus, TlError> {
    let Some(tree) = reader.load_tree(&row.hash)? else {
        println!(
            "\n用户尚未下载剧情数据 {} ({})，或哈希已变化。跳过。",
            row.file_name, row.hash
        );
        return Ok(ExtractStatus::SkippedMissing);
    };

    let document = flatten_document(row, &tree)?;

    let (_, rel) = paths::relative_document_path(&row.file_name)?;
    let write_path = cfg.assets_editing_dir.join(rel);

    if !is_new && write_path.exists() {
        println!("\n剧情数据 {} 已变更。备份旧文件后替换。", row.file_name);
        backup_rename(&write_path)?;
    }

    save_json(&write_path, &document)?;
    Ok(ExtractStatus::Written)
}

/// 把字段树摊平成有序单元序列（译文字段留空）
pub fn flatten_document(row: &AssetRow, tree: &Value) -> Result<StoryDocument, TlError> {
    let kind = AssetKind::of(&row.file_name)?;

    let mut document = StoryDocument {
        version: SCHEMA_VERSION,
        row_index: row.row_index,
        file_name: row.file_name.clone(),
        hash: row.hash.clone(),
        title: None,
        data: Vec::new(),
    };

    if kind == AssetKind::Race {
        for item in field_array(tree, "textData")? {
            document.data.push(StoryUnit {
                path_id: None,
                block_id: None,
                text: String::new(),
                source: field_str(item, "text")?.to_string(),
                name: None,
                source_name: None,
                clip_length: None,
                source_clip_length: None,
                anim_data: None,
                choices: None,
                color_info: None,
            });
        }
        return Ok(document);
    }

    document.title = Some(field_str(tree, "Title")?.to_string());

    // 文档内对象表：path id -> 字段树
    let objects = tree
        .get("files")
        .and_then(|v| v.as_object())
        .ok_or_else(|| TlError::MalformedDocument("missing object table: files".to_string()))?;

    for block in field_array(tree, "BlockList")? {
        let block_id = field_i64(block, "BlockIndex")?;
        let text_track = block
            .get("TextTrack")
            .ok_or_else(|| TlError::MalformedDocument("missing field: TextTrack".to_string()))?;

        for clip in field_array(text_track, "ClipList")? {
            let path_id = field_i64(clip, "m_PathID")?;
            let text_data = objects.get(&path_id.to_string()).ok_or_else(|| {
                TlError::MalformedDocument(format!("dangling path id: {}", path_id))
            })?;

            let mut unit = StoryUnit {
                path_id: Some(path_id),
                block_id: Some(block_id),
                text: String::new(),
                source: field_str(text_data, "Text")?.to_string(),
                name: Some(String::new()),
                source_name: Some(field_str(text_data, "Name")?.to_string()),
                clip_length: None,
                source_clip_length: None,
                anim_data: None,
                choices: None,
                color_info: None,
            };

            if let Some(length) = nonzero_number(text_data.get("ClipLength")) {
                unit.clip_length = Some(length.clone());
                unit.source_clip_length = Some(length);
                unit.anim_data = collect_anim_data(block, objects)?;
            }

            unit.choices = collect_sub_units(text_data.get("ChoiceDataList"))?;
            unit.color_info = collect_sub_units(text_data.get("ColorTextInfoList"))?;

            document.data.push(unit);
        }
    }

    Ok(document)
}

/// 取出非零的数值字段（缺失、null、0 都视为没有）
fn nonzero_number(value: Option<&Value>) -> Option<Number> {
    let number = value?.as_number()?;
    if number.as_f64() == Some(0.0) {
        return None;
    }
    Some(number.clone())
}

/// 收集各角色动作轨道末端片段的时长元数据
fn collect_anim_data(
    block: &Value,
    objects: &serde_json::Map<String, Value>,
) -> Result<Option<Vec<AnimEntry>>, TlError> {
    let mut entries = Vec::new();

    for track_group in field_array(block, "CharacterTrackList")? {
        let Some(group) = track_group.as_object() else {
            continue;
        };
        for (key, track) in group {
            if !key.ends_with("MotionTrackData") {
                continue;
            }
            let Some(clips) = track.get("ClipList").and_then(|v| v.as_array()) else {
                continue;
            };
            let Some(last_clip) = clips.last() else {
                continue;
            };
            let clip_path_id = field_i64(last_clip, "m_PathID")?;
            if let Some(anim_tree) = objects.get(&clip_path_id.to_string()) {
                let orig_length = anim_tree
                    .get("ClipLength")
                    .and_then(|v| v.as_number())
                    .ok_or_else(|| {
                        TlError::MalformedDocument(format!(
                            "animation clip {} has no length",
                            clip_path_id
                        ))
                    })?;
                entries.push(AnimEntry {
                    orig_length: orig_length.clone(),
                    path_id: clip_path_id,
                });
            }
        }
    }

    Ok(if entries.is_empty() { None } else { Some(entries) })
}

/// 收集选项/染色文本子单元（空列表视为没有）
fn collect_sub_units(value: Option<&Value>) -> Result<Option<Vec<SubUnit>>, TlError> {
    let Some(list) = value.and_then(|v| v.as_array()) else {
        return Ok(None);
    };
    if list.is_empty() {
        return Ok(None);
    }

    let mut units = Vec::with_capacity(list.len());
    for item in list {
        units.push(SubUnit {
            text: String::new(),
            source: field_str(item, "Text")?.to_string(),
        });
    }
    Ok(Some(units))
}

/// 用一个已发布的翻译文件回填对应的编辑文件
///
/// 编辑文件可能被删过或已过期；这一步保证已经发布过的译文不会
/// 在编辑目录里丢失。哈希不一致时不做合并（结构已漂移）。
pub fn sync_from_shipped(
    cfg: &WorkspaceConfig,
    reader: &dyn AssetReader,
    shipped_path: &Path,
) -> Result<SyncStatus, TlError> {
    let shipped: Value = load_json(shipped_path)?;
    let file_name = field_str(&shipped, "file_name")?.to_string();
    let shipped_hash = field_str(&shipped, "hash")?.to_string();
    let row = AssetRow {
        row_index: field_i64(&shipped, "row_index")?,
        file_name: file_name.clone(),
        hash: shipped_hash.clone(),
    };

    let (kind, rel) = paths::relative_document_path(&file_name)?;
    let editing_path = cfg.assets_editing_dir.join(rel);

    if !editing_path.exists() {
        // 翻译存在但编辑文件没有：按源内容重建一份
        extract_document(cfg, reader, &row, true)?;
    }

    if !editing_path.exists() {
        // 源内容本地已不存在，原始文本无从恢复；把已发布文件本身存档
        println!(
            "\n剧情数据 {} (哈希 {}) 已不存在。用翻译文件创建备份。",
            file_name, shipped_hash
        );
        backup_copy(shipped_path, &editing_path)?;
        return Ok(SyncStatus::ArchivedShipped);
    }

    let mut document: StoryDocument = match load_json(&editing_path) {
        Ok(document) => document,
        Err(TlError::JsonError(e)) => {
            println!("\n读取 {:?} 失败: {}。移入备份。", editing_path, e);
            backup_rename(&editing_path)?;
            return Ok(SyncStatus::Quarantined);
        }
        Err(e) => return Err(e),
    };

    if document.hash != shipped_hash {
        return Ok(SyncStatus::Stale);
    }

    let shipped_units = field_array(&shipped, "data")?;
    for (i, line) in shipped_units.iter().enumerate() {
        let Some(unit) = document.data.get_mut(i) else {
            break;
        };

        if kind == AssetKind::Race {
            // race 文档的已发布单元就是纯文本
            if let Some(text) = line.as_str() {
                unit.text = text.to_string();
            }
            continue;
        }

        let shipped_unit: ShippedUnit = serde_json::from_value(line.clone())?;
        let has_name = shipped_unit.name.as_deref().map_or(false, |n| !n.is_empty());
        if shipped_unit.text.is_empty() && !has_name {
            continue;
        }

        unit.text = shipped_unit.text;
        if shipped_unit.name.is_some() {
            unit.name = shipped_unit.name;
        }
        if shipped_unit.clip_length.is_some() {
            unit.clip_length = shipped_unit.clip_length;
        }
        if shipped_unit.anim_data.is_some() {
            unit.anim_data = shipped_unit.anim_data;
        }
        if shipped_unit.choices.is_some() {
            unit.choices = shipped_unit.choices;
        }
        if shipped_unit.color_info.is_some() {
            unit.color_info = shipped_unit.color_info;
        }
    }

    save_json(&editing_path, &document)?;
    Ok(SyncStatus::Merged)
}
