//! 编辑后贴图与原始贴图之间的字节级 XOR diff
//!
//! 分发的是 diff 而不是成品图；消费端用原始贴图加 diff 还原出
//! 编辑后的图。两个缓冲区在做 diff 时长度相等，还原才是精确的。

use crate::utils::TlError;
use rand::Rng;
use std::path::Path;

/// 生成 diff：`diff = edited ⊕ source`
///
/// 两边先补齐到相同长度再逐字节异或。源文件一侧补零；编辑稿一侧
/// 较短时用随机字节补齐，所以长度不等的情况下 diff 不可精确还原。
pub fn diff(edited: &[u8], source: &[u8]) -> Vec<u8> {
    let max_len = edited.len().max(source.len());

    let mut edited = edited.to_vec();
    let mut rng = rand::thread_rng();
    while edited.len() < max_len {
        edited.push(rng.gen());
    }

    let mut source = source.to_vec();
    source.resize(max_len, 0);

    xor_bytes(&edited, &source)
}

/// 还原：`reconstructed = diff ⊕ source`
///
/// 两边都补零到相同长度再异或。
pub fn patch(diff: &[u8], source: &[u8]) -> Vec<u8> {
    let max_len = diff.len().max(source.len());

    let mut diff = diff.to_vec();
    diff.resize(max_len, 0);

    let mut source = source.to_vec();
    source.resize(max_len, 0);

    xor_bytes(&diff, &source)
}

fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// 从磁盘上的编辑稿和原始图生成 diff 文件
pub fn create_diff_file(
    edited_path: &Path,
    source_path: &Path,
    diff_path: &Path,
) -> Result<(), TlError> {
    let edited = std::fs::read(edited_path)?;
    let source = std::fs::read(source_path)?;

    std::fs::write(diff_path, diff(&edited, &source))?;
    Ok(())
}

/// 用 diff 文件和原始图还原出编辑后的图
pub fn apply_diff_file(
    diff_path: &Path,
    source_path: &Path,
    output_path: &Path,
) -> Result<(), TlError> {
    let diff_bytes = std::fs::read(diff_path)?;
    let source = std::fs::read(source_path)?;

    std::fs::write(output_path, patch(&diff_bytes, &source))?;
    Ok(())
}
