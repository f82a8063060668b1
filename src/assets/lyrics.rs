//! 歌词文档的抽取与合并
//!
//! 歌词每次都整体重抽，再按行位置从缓存的编辑文件和已发布翻译里
//! 把译文合并回来：行哈希一致才带回译文，不一致时保留旧译文到
//! `prev_text` 并标记 `changed`。

use crate::assets::{field_str, paths, ExtractStatus, LYRICS_PATTERN};
use crate::batch::run_batch;
use crate::config::WorkspaceConfig;
use crate::hashing::content_hash;
use crate::reader::AssetReader;
use crate::record::SCHEMA_VERSION;
use crate::store::{AssetCatalog, AssetRow};
use crate::utils::{load_json, save_json, TlError};
use serde::{Deserialize, Serialize};

/// 一首歌词的编辑状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricDocument {
    pub version: u32,
    pub row_index: i64,
    pub file_name: String,
    pub hash: String,
    pub data: Vec<LyricUnit>,
}

/// 歌词的一行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LyricUnit {
    pub text: String,
    pub prev_text: String,
    pub source: String,
    /// 这一行源文本的哈希（不是整份文档的哈希）
    pub hash: String,
    /// 位置对应的缓存行哈希与当前行不一致
    pub changed: bool,
}

/// 已发布歌词文件里的一行
#[derive(Debug, Deserialize)]
struct ShippedLyricUnit {
    #[serde(default)]
    text: String,
    #[serde(default)]
    hash: String,
}

/// 索引所有歌词
pub fn index_lyrics(
    cfg: &WorkspaceConfig,
    catalog: &dyn AssetCatalog,
    reader: &dyn AssetReader,
) -> Result<(), TlError> {
    println!("=== 索引歌词 ===");

    let rows = catalog.list(&[LYRICS_PATTERN])?;
    if rows.is_empty() {
        return Err(TlError::EmptyCatalog("lyrics".to_string()));
    }

    let outcome = run_batch(
        rows,
        |r| r.file_name.clone(),
        |r| index_one_lyric(cfg, reader, r),
    );
    outcome.report_failures();
    println!("歌词处理完成 {} 个文件", outcome.ok_count());

    Ok(())
}

/// 抽取并合并一首歌词
pub fn index_one_lyric(
    cfg: &WorkspaceConfig,
    reader: &dyn AssetReader,
    row: &AssetRow,
) -> Result<ExtractStatus, TlError> {
    let Some(tree) = reader.load_tree(&row.hash)? else {
        println!("\n用户尚未下载歌词 {}。跳过。", row.file_name);
        return Ok(ExtractStatus::SkippedMissing);
    };

    let rel = paths::lyrics_relative_path(&row.file_name)?;
    let write_path = cfg.assets_editing_dir.join(&rel);
    let shipped_path = cfg.assets_output_dir.join(&rel);

    // 脚本是CSV形式的文本，第一行是表头
    let script = field_str(&tree, "m_Script")?;
    let lines: Vec<&str> = script
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    let cached_editing: Vec<LyricUnit> = if write_path.exists() {
        load_json::<LyricDocument>(&write_path)?.data
    } else {
        Vec::new()
    };

    let cached_shipped: Vec<ShippedLyricUnit> = if shipped_path.exists() {
        load_json::<serde_json::Value>(&shipped_path)?
            .get("data")
            .map(|data| serde_json::from_value(data.clone()))
            .transpose()?
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let mut units = Vec::new();
    for (index, line) in lines.iter().skip(1).enumerate() {
        let (_, source) = line.split_once(',').ok_or_else(|| {
            TlError::MalformedDocument(format!("lyric line has no timestamp: {}", line))
        })?;

        let mut unit = LyricUnit {
            text: String::new(),
            prev_text: String::new(),
            source: source.to_string(),
            hash: content_hash(source),
            changed: false,
        };

        if let Some(cached) = cached_editing.get(index) {
            if !cached.text.is_empty() {
                unit.prev_text = cached.text.clone();
                if cached.hash != unit.hash {
                    unit.changed = true;
                } else {
                    unit.text = cached.text.clone();
                }
            }
        }

        if let Some(cached) = cached_shipped.get(index) {
            if !cached.text.is_empty() {
                if cached.hash != unit.hash {
                    unit.changed = true;
                } else {
                    unit.text = cached.text.clone();
                }
            }
        }

        units.push(unit);
    }

    let document = LyricDocument {
        version: SCHEMA_VERSION,
        row_index: row.row_index,
        file_name: row.file_name.clone(),
        hash: row.hash.clone(),
        data: units,
    };

    save_json(&write_path, &document)?;
    Ok(ExtractStatus::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct FakeReader {
        trees: HashMap<String, Value>,
    }

    impl AssetReader for FakeReader {
        fn load_tree(&self, hash: &str) -> Result<Option<Value>, TlError> {
            Ok(self.trees.get(hash).cloned())
        }

        fn load_texture(&self, _hash: &str) -> Result<Option<Vec<u8>>, TlError> {
            Ok(None)
        }
    }

    fn reader_with_script(hash: &str, script: &str) -> FakeReader {
        let mut trees = HashMap::new();
        trees.insert(hash.to_string(), json!({ "m_Script": script }));
        FakeReader { trees }
    }

    fn workspace(dir: &TempDir) -> WorkspaceConfig {
        let mut cfg = WorkspaceConfig::default();
        cfg.assets_editing_dir = dir.path().join("editing/assets");
        cfg.assets_output_dir = dir.path().join("translations/assets");
        cfg
    }

    fn lyric_row(hash: &str) -> AssetRow {
        AssetRow {
            row_index: 9,
            file_name: "live/musicscores/m1001/m1001_lyrics".to_string(),
            hash: hash.to_string(),
        }
    }

    #[test]
    fn test_first_extraction() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);
        let reader = reader_with_script("h1", "time,lyrics\n0,うまぴょい\n1500,そだちました\n");

        index_one_lyric(&cfg, &reader, &lyric_row("h1")).unwrap();

        let document: LyricDocument =
            load_json(&cfg.assets_editing_dir.join("lyrics/1001.json")).unwrap();
        assert_eq!(document.data.len(), 2);
        assert_eq!(document.data[0].source, "うまぴょい");
        assert_eq!(document.data[0].hash, content_hash("うまぴょい"));
        assert!(!document.data[0].changed);
        assert_eq!(document.data[0].text, "");
    }

    #[test]
    fn test_merge_keeps_translation_when_hash_matches() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);
        let reader = reader_with_script("h1", "time,lyrics\n0,うまぴょい\n");

        index_one_lyric(&cfg, &reader, &lyric_row("h1")).unwrap();

        let path = cfg.assets_editing_dir.join("lyrics/1001.json");
        let mut document: LyricDocument = load_json(&path).unwrap();
        document.data[0].text = "umapyoi".to_string();
        save_json(&path, &document).unwrap();

        // 行内容没变：译文保留
        index_one_lyric(&cfg, &reader, &lyric_row("h1")).unwrap();
        let document: LyricDocument = load_json(&path).unwrap();
        assert_eq!(document.data[0].text, "umapyoi");
        assert_eq!(document.data[0].prev_text, "umapyoi");
        assert!(!document.data[0].changed);
    }

    #[test]
    fn test_merge_flags_changed_line() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);

        let reader = reader_with_script("h1", "time,lyrics\n0,うまぴょい\n");
        index_one_lyric(&cfg, &reader, &lyric_row("h1")).unwrap();

        let path = cfg.assets_editing_dir.join("lyrics/1001.json");
        let mut document: LyricDocument = load_json(&path).unwrap();
        document.data[0].text = "umapyoi".to_string();
        save_json(&path, &document).unwrap();

        // 同一位置的行内容变了：译文不带回，旧译文留在 prev_text
        let reader = reader_with_script("h2", "time,lyrics\n0,あたらしい歌詞\n");
        index_one_lyric(&cfg, &reader, &lyric_row("h2")).unwrap();

        let document: LyricDocument = load_json(&path).unwrap();
        assert!(document.data[0].changed);
        assert_eq!(document.data[0].text, "");
        assert_eq!(document.data[0].prev_text, "umapyoi");
        assert_eq!(document.hash, "h2");
    }

    #[test]
    fn test_merge_from_shipped_translation() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);
        let reader = reader_with_script("h1", "time,lyrics\n0,うまぴょい\n");

        // 编辑文件不存在，但已发布翻译在
        save_json(
            &cfg.assets_output_dir.join("lyrics/1001.json"),
            &json!({
                "row_index": 9,
                "file_name": "live/musicscores/m1001/m1001_lyrics",
                "hash": "h1",
                "data": [{ "text": "umapyoi", "hash": content_hash("うまぴょい") }]
            }),
        )
        .unwrap();

        index_one_lyric(&cfg, &reader, &lyric_row("h1")).unwrap();

        let document: LyricDocument =
            load_json(&cfg.assets_editing_dir.join("lyrics/1001.json")).unwrap();
        assert_eq!(document.data[0].text, "umapyoi");
    }

    #[test]
    fn test_missing_content_skips() {
        let dir = TempDir::new().unwrap();
        let cfg = workspace(&dir);
        let reader = FakeReader {
            trees: HashMap::new(),
        };

        let status = index_one_lyric(&cfg, &reader, &lyric_row("h1")).unwrap();
        assert_eq!(status, ExtractStatus::SkippedMissing);
    }
}
