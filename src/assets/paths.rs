//! 输出路径推导
//!
//! 每种资源前缀都有自己的片段提取规则，登记在一张查表里，
//! 规则本身是纯函数，可独立测试。推导出的相对路径同时用于
//! 编辑目录和翻译输出目录，保证两边一一对应。

use crate::utils::TlError;
use std::path::PathBuf;

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// 剧情时间线（story/）
    Story,
    /// 主界面对话（home/）
    Home,
    /// 实况文本（race/），单字段文档
    Race,
}

type SegmentFn = fn(&str, &str) -> Result<Vec<String>, TlError>;

/// 前缀 → 类型 + 片段提取规则
const ROUTES: [(&str, AssetKind, SegmentFn); 3] = [
    ("story/", AssetKind::Story, story_segments),
    ("home/", AssetKind::Home, home_segments),
    ("race/", AssetKind::Race, race_segments),
];

impl AssetKind {
    /// 从资源文件名判断类型
    pub fn of(file_name: &str) -> Result<AssetKind, TlError> {
        ROUTES
            .iter()
            .find(|(prefix, _, _)| file_name.starts_with(prefix))
            .map(|(_, kind, _)| *kind)
            .ok_or_else(|| TlError::UnknownAssetKind(file_name.to_string()))
    }
}

/// 推导剧情类文档的相对路径（相对编辑/输出目录的根）
pub fn relative_document_path(file_name: &str) -> Result<(AssetKind, PathBuf), TlError> {
    let (dir, name) = file_name
        .rsplit_once('/')
        .ok_or_else(|| TlError::UnknownAssetKind(file_name.to_string()))?;

    let (_, kind, segments_fn) = ROUTES
        .iter()
        .find(|(prefix, _, _)| file_name.starts_with(prefix))
        .ok_or_else(|| TlError::UnknownAssetKind(file_name.to_string()))?;

    let segments = segments_fn(dir, name)?;
    let mut path = PathBuf::new();
    for segment in segments {
        path.push(segment);
    }
    Ok((*kind, path))
}

/// 推导歌词文档的相对路径
///
/// `live/musicscores/m<曲目号>/m<曲目号>_lyrics` → `lyrics/<曲目号>.json`
pub fn lyrics_relative_path(file_name: &str) -> Result<PathBuf, TlError> {
    let dir_name = file_name
        .split('/')
        .nth(2)
        .filter(|s| s.len() > 1)
        .ok_or_else(|| TlError::UnknownAssetKind(file_name.to_string()))?;

    Ok(PathBuf::from("lyrics").join(format!("{}.json", &dir_name[1..])))
}

/// 文件名末尾的片段：倒数第 `start_back` 到倒数第 `end_back` 个字符
fn tail(name: &str, start_back: usize, end_back: usize) -> Result<&str, TlError> {
    if start_back > name.len() || end_back > start_back {
        return Err(TlError::UnknownAssetKind(name.to_string()));
    }
    name.get(name.len() - start_back..name.len() - end_back)
        .ok_or_else(|| TlError::UnknownAssetKind(name.to_string()))
}

fn split_dir(dir: String) -> Vec<String> {
    dir.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// story/data/<组>/<话>/storytimeline_xxxxxxxxx → story/<组>/<话>/<末3位>.json
fn story_segments(dir: &str, name: &str) -> Result<Vec<String>, TlError> {
    let mut segments = split_dir(dir.replace("/data/", "/"));
    segments.push(format!("{}.json", tail(name, 3, 0)?));
    Ok(segments)
}

/// home/data/<组>/<类>/hometimeline_... → home/<组>/<类>/<倒数7-3位>/<末3位>.json
fn home_segments(dir: &str, name: &str) -> Result<Vec<String>, TlError> {
    let mut segments = split_dir(dir.replace("/data/", "/"));
    segments.push(tail(name, 7, 3)?.to_string());
    segments.push(format!("{}.json", tail(name, 3, 0)?));
    Ok(segments)
}

/// race/storyrace/text/storyrace_xxxxxxxxx → race/<末9-7位>/<倒数7-3位>/<末3位>.json
fn race_segments(dir: &str, name: &str) -> Result<Vec<String>, TlError> {
    let mut segments = split_dir(dir.replace("/storyrace/text", "/"));
    segments.push(tail(name, 9, 7)?.to_string());
    segments.push(tail(name, 7, 3)?.to_string());
    segments.push(format!("{}.json", tail(name, 3, 0)?));
    Ok(segments)
}
