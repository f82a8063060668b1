//! 图集贴图的索引
//!
//! 把解码后的贴图写进编辑目录，同时留一份 `.org.png` 原始副本
//! 供后续做字节diff，并写一个记录来源哈希的旁车JSON。

use crate::assets::{ExtractStatus, ATLAS_PATTERN};
use crate::batch::run_batch;
use crate::config::WorkspaceConfig;
use crate::reader::AssetReader;
use crate::record::SCHEMA_VERSION;
use crate::store::{AssetCatalog, AssetRow};
use crate::utils::{ensure_parent_dir, save_json, TlError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 贴图的旁车元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasSidecar {
    pub version: u32,
    pub row_index: i64,
    pub file_name: String,
    pub hash: String,
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// 索引所有图集贴图
pub fn index_atlas(
    cfg: &WorkspaceConfig,
    catalog: &dyn AssetCatalog,
    reader: &dyn AssetReader,
) -> Result<(), TlError> {
    println!("=== 索引图集 ===");

    let rows = catalog.list(&[ATLAS_PATTERN])?;
    if rows.is_empty() {
        return Err(TlError::EmptyCatalog("atlas".to_string()));
    }

    let outcome = run_batch(
        rows,
        |r| r.file_name.clone(),
        |r| index_one_atlas(cfg, reader, r),
    );
    outcome.report_failures();
    println!("图集处理完成 {} 个文件", outcome.ok_count());

    Ok(())
}

/// 导出一张贴图及其旁车元数据
pub fn index_one_atlas(
    cfg: &WorkspaceConfig,
    reader: &dyn AssetReader,
    row: &AssetRow,
) -> Result<ExtractStatus, TlError> {
    let Some(texture) = reader.load_texture(&row.hash)? else {
        println!("\n用户尚未下载图集 {}。跳过。", row.file_name);
        return Ok(ExtractStatus::SkippedMissing);
    };

    let dest = cfg.assets_editing_dir.join(&row.file_name);
    ensure_parent_dir(&dest)?;

    // 可编辑副本和原始副本各留一份
    std::fs::write(with_suffix(&dest, ".png"), &texture)?;
    std::fs::write(with_suffix(&dest, ".org.png"), &texture)?;

    save_json(
        &with_suffix(&dest, ".json"),
        &AtlasSidecar {
            version: SCHEMA_VERSION,
            row_index: row.row_index,
            file_name: row.file_name.clone(),
            hash: row.hash.clone(),
        },
    )?;

    Ok(ExtractStatus::Written)
}
