//! 资源翻译输出的最终化
//!
//! 把编辑文件投影成消费端需要的形状：去掉 source 系字段和版本号，
//! 只保留译文。单元本身按位置原样保留（消费端靠位置对应），但
//! 整份文件所有单元都没有译文时直接跳过，不产出文件。

use crate::assets::paths::AssetKind;
use crate::assets::story::{AnimEntry, StoryDocument, SubUnit};
use crate::assets::lyrics::LyricDocument;
use crate::batch::run_batch;
use crate::config::WorkspaceConfig;
use crate::utils::{collect_json_files, load_json, save_json, TlError};
use serde::Serialize;
use serde_json::{Number, Value};
use std::path::Path;

/// 单个文件的最终化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStatus {
    Written,
    /// 整份文件没有任何译文，不产出
    SkippedEmpty,
}

/// 消费端的剧情文档
#[derive(Debug, Serialize)]
struct ShippedDocument {
    row_index: i64,
    file_name: String,
    hash: String,
    data: Vec<Value>,
}

/// 消费端的剧情单元（race 文档的单元是纯文本，不走这个结构）
#[derive(Debug, Serialize)]
struct ShippedStoryUnit {
    text: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    clip_length: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    choices: Option<Vec<SubUnit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anim_data: Option<Vec<AnimEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_info: Option<Vec<SubUnit>>,
}

/// 消费端的歌词单元
#[derive(Debug, Serialize)]
struct ShippedLyricUnit {
    text: String,
    hash: String,
}

/// 最终化所有资源翻译
pub fn finalize_assets(cfg: &WorkspaceConfig) -> Result<(), TlError> {
    println!("=== 生成资源翻译输出 ===");
    finalize_lyrics(cfg)?;
    finalize_stories(cfg)?;
    println!("Done");
    Ok(())
}

/// 最终化所有剧情类文档
pub fn finalize_stories(cfg: &WorkspaceConfig) -> Result<(), TlError> {
    println!("=== 剧情 ===");

    let mut files = Vec::new();
    for sub in ["story", "home", "race"] {
        files.extend(collect_json_files(&cfg.assets_editing_dir.join(sub))?);
    }

    let outcome = run_batch(
        files,
        |p| p.display().to_string(),
        |p| finalize_story_file(cfg, p),
    );
    outcome.report_failures();

    let written = outcome
        .results
        .iter()
        .filter(|s| **s == FinalizeStatus::Written)
        .count();
    println!("产出 {} 个文件", written);

    Ok(())
}

/// 最终化一份剧情文档
pub fn finalize_story_file(cfg: &WorkspaceConfig, path: &Path) -> Result<FinalizeStatus, TlError> {
    let document: StoryDocument = load_json(path)?;
    let kind = AssetKind::of(&document.file_name)?;

    let mut data = Vec::with_capacity(document.data.len());
    let mut empty_count = 0;

    for unit in document.data {
        if kind == AssetKind::Race {
            if unit.text.is_empty() {
                empty_count += 1;
            }
            data.push(Value::String(unit.text));
            continue;
        }

        let name = unit.name.unwrap_or_default();
        if unit.text.is_empty() && name.is_empty() {
            empty_count += 1;
        }

        data.push(serde_json::to_value(ShippedStoryUnit {
            text: unit.text,
            name,
            clip_length: unit.clip_length,
            choices: unit.choices,
            anim_data: unit.anim_data,
            color_info: unit.color_info,
        })?);
    }

    if empty_count == data.len() {
        return Ok(FinalizeStatus::SkippedEmpty);
    }

    let shipped = ShippedDocument {
        row_index: document.row_index,
        file_name: document.file_name,
        hash: document.hash,
        data,
    };

    save_json(&shipped_output_path(cfg, path)?, &shipped)?;
    Ok(FinalizeStatus::Written)
}

/// 最终化所有歌词
pub fn finalize_lyrics(cfg: &WorkspaceConfig) -> Result<(), TlError> {
    println!("=== 歌词 ===");

    let files = collect_json_files(&cfg.assets_editing_dir.join("lyrics"))?;

    let outcome = run_batch(
        files,
        |p| p.display().to_string(),
        |p| finalize_lyric_file(cfg, p),
    );
    outcome.report_failures();

    Ok(())
}

/// 最终化一首歌词
pub fn finalize_lyric_file(cfg: &WorkspaceConfig, path: &Path) -> Result<FinalizeStatus, TlError> {
    let document: LyricDocument = load_json(path)?;

    let mut data = Vec::with_capacity(document.data.len());
    let mut empty_count = 0;

    for unit in document.data {
        if unit.text.is_empty() {
            empty_count += 1;
        }
        data.push(serde_json::to_value(ShippedLyricUnit {
            text: unit.text,
            hash: unit.hash,
        })?);
    }

    if empty_count == data.len() {
        return Ok(FinalizeStatus::SkippedEmpty);
    }

    let shipped = ShippedDocument {
        row_index: document.row_index,
        file_name: document.file_name,
        hash: document.hash,
        data,
    };

    save_json(&shipped_output_path(cfg, path)?, &shipped)?;
    Ok(FinalizeStatus::Written)
}

/// 编辑文件路径映射到输出路径（两棵树布局一致）
fn shipped_output_path(cfg: &WorkspaceConfig, editing_path: &Path) -> Result<std::path::PathBuf, TlError> {
    let rel = editing_path
        .strip_prefix(&cfg.assets_editing_dir)
        .map_err(|_| {
            TlError::MalformedDocument(format!("{:?} not under editing dir", editing_path))
        })?;
    Ok(cfg.assets_output_dir.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::story::StoryUnit;
    use crate::record::SCHEMA_VERSION;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> WorkspaceConfig {
        let mut cfg = WorkspaceConfig::default();
        cfg.assets_editing_dir = dir.path().join("editing/assets");
        cfg.assets_output_dir = dir.path().join("translations/assets");
        cfg
    }

    fn unit(text: &str, source: &str, name: &str) -> StoryUnit {
        StoryUnit {
            path_id: Some(1),
            block_id: Some(0),
            text: text.to_string(),
            source: source.to_string(),
            name: Some(name.to_string()),
            source_name: Some(String::new()),
            clip_length: None,
            source_clip_length: None,
            anim_data: None,
            choices: None,
            color_info: None,
        }
    }

    fn story_document(units: Vec<StoryUnit>) -> StoryDocument {
        StoryDocument {
            version: SCHEMA_VERSION,
            row_index: 1,
            file_name: "story/data/04/1001/storytimeline_001001001".to_string(),
            hash: "ha".to_string(),
            title: Some("タイトル".to_string()),
            data: units,
        }
    }

    #[test]
    fn test_story_projection_drops_bookkeeping() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let editing_path = cfg.assets_editing_dir.join("story/04/1001/001.json");
        save_json(
            &editing_path,
            &story_document(vec![unit("Hello", "こんにちは", "Spe"), unit("", "次", "")]),
        )
        .unwrap();

        let status = finalize_story_file(&cfg, &editing_path).unwrap();
        assert_eq!(status, FinalizeStatus::Written);

        let shipped: Value =
            load_json(&cfg.assets_output_dir.join("story/04/1001/001.json")).unwrap();

        // source 系字段和版本号都不进输出
        assert!(shipped.get("version").is_none());
        assert!(shipped.get("title").is_none());
        assert_eq!(shipped["hash"], "ha");
        assert!(shipped["data"][0].get("source").is_none());
        assert_eq!(shipped["data"][0]["text"], "Hello");
        // 空单元按位置保留
        assert_eq!(shipped["data"][1]["text"], "");
    }

    #[test]
    fn test_all_empty_story_is_skipped() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let editing_path = cfg.assets_editing_dir.join("story/04/1001/001.json");
        save_json(
            &editing_path,
            &story_document(vec![unit("", "a", ""), unit("", "b", "")]),
        )
        .unwrap();

        let status = finalize_story_file(&cfg, &editing_path).unwrap();
        assert_eq!(status, FinalizeStatus::SkippedEmpty);
        assert!(!cfg.assets_output_dir.join("story/04/1001/001.json").exists());
    }

    #[test]
    fn test_name_only_unit_counts_as_translated() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let editing_path = cfg.assets_editing_dir.join("story/04/1001/001.json");
        save_json(
            &editing_path,
            &story_document(vec![unit("", "a", "Spe")]),
        )
        .unwrap();

        assert_eq!(
            finalize_story_file(&cfg, &editing_path).unwrap(),
            FinalizeStatus::Written
        );
    }

    #[test]
    fn test_race_projection_is_plain_strings() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let mut document = story_document(vec![
            unit("First corner", "第1コーナー", ""),
            unit("", "最終直線", ""),
        ]);
        document.file_name = "race/storyrace/text/storyrace_009001001".to_string();
        document.title = None;
        for u in &mut document.data {
            u.path_id = None;
            u.block_id = None;
            u.name = None;
            u.source_name = None;
        }

        let editing_path = cfg.assets_editing_dir.join("race/00/9001/001.json");
        save_json(&editing_path, &document).unwrap();

        finalize_story_file(&cfg, &editing_path).unwrap();

        let shipped: Value =
            load_json(&cfg.assets_output_dir.join("race/00/9001/001.json")).unwrap();
        assert_eq!(shipped["data"][0], "First corner");
        assert_eq!(shipped["data"][1], "");
    }

    #[test]
    fn test_lyrics_projection() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let editing_path = cfg.assets_editing_dir.join("lyrics/1001.json");
        save_json(
            &editing_path,
            &serde_json::json!({
                "version": SCHEMA_VERSION,
                "row_index": 9,
                "file_name": "live/musicscores/m1001/m1001_lyrics",
                "hash": "h1",
                "data": [
                    { "text": "umapyoi", "prev_text": "", "source": "うまぴょい", "hash": "lh1", "changed": false },
                    { "text": "", "prev_text": "", "source": "そだちました", "hash": "lh2", "changed": false }
                ]
            }),
        )
        .unwrap();

        let status = finalize_lyric_file(&cfg, &editing_path).unwrap();
        assert_eq!(status, FinalizeStatus::Written);

        let shipped: Value = load_json(&cfg.assets_output_dir.join("lyrics/1001.json")).unwrap();
        assert_eq!(shipped["data"][0]["text"], "umapyoi");
        assert_eq!(shipped["data"][0]["hash"], "lh1");
        assert!(shipped["data"][0].get("source").is_none());
        assert!(shipped["data"][0].get("prev_text").is_none());
    }

    #[test]
    fn test_all_empty_lyrics_skipped() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let editing_path = cfg.assets_editing_dir.join("lyrics/1001.json");
        save_json(
            &editing_path,
            &serde_json::json!({
                "version": SCHEMA_VERSION,
                "row_index": 9,
                "file_name": "live/musicscores/m1001/m1001_lyrics",
                "hash": "h1",
                "data": [
                    { "text": "", "prev_text": "", "source": "うまぴょい", "hash": "lh1", "changed": false }
                ]
            }),
        )
        .unwrap();

        assert_eq!(
            finalize_lyric_file(&cfg, &editing_path).unwrap(),
            FinalizeStatus::SkippedEmpty
        );
        assert!(!cfg.assets_output_dir.join("lyrics/1001.json").exists());
    }
}
