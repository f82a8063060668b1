use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tl_sync::{
    assets, finalize, imagediff, intermediate, DirectoryAssetReader, SqliteAssetCatalog,
    SqliteContentStore, TableIndex, WorkspaceConfig,
};

#[derive(Parser)]
#[command(name = "tl_sync")]
#[command(about = "把游戏文本/图片内容与人工翻译的中间文件保持同步")]
#[command(version)]
struct Cli {
    /// 工作目录配置文件路径（不存在时使用默认布局）
    #[arg(short, long, default_value = "workspace.json")]
    config: PathBuf,

    /// 表索引文件路径（不存在时使用内置索引）
    #[arg(long, default_value = "index.json")]
    index: PathBuf,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 从游戏数据库生成可编辑的文本中间文件
    IndexMdb,
    /// 把译者完成的文本记录展开成翻译输出树
    MdbOutput,
    /// 索引所有资源（歌词、剧情、图集）
    IndexAssets,
    /// 只索引歌词
    IndexLyrics,
    /// 只索引剧情文本
    IndexStories,
    /// 只索引图集贴图
    IndexAtlas,
    /// 把资源编辑文件最终化成翻译输出
    FinalizeAssets,
    /// 为编辑后的贴图生成字节diff
    AtlasDiff {
        /// 编辑后的图片
        #[arg(long)]
        edited: PathBuf,
        /// 原始图片
        #[arg(long)]
        source: PathBuf,
        /// diff输出路径
        #[arg(short, long)]
        output: PathBuf,
    },
    /// 用diff和原始贴图还原编辑后的图片
    AtlasPatch {
        /// diff文件
        #[arg(long)]
        diff: PathBuf,
        /// 原始图片
        #[arg(long)]
        source: PathBuf,
        /// 还原输出路径
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = WorkspaceConfig::load(&cli.config)?;
    let index = TableIndex::load_or_embedded(&cli.index)?;

    match &cli.command {
        Command::IndexMdb => handle_index_mdb(&cli, &cfg, &index),
        Command::MdbOutput => handle_mdb_output(&cli, &cfg, &index),
        Command::IndexAssets => {
            let catalog = SqliteAssetCatalog::open(&cfg.meta_db_path)?;
            let reader = DirectoryAssetReader::new(cfg.data_dir.clone());
            assets::index_assets(&cfg, &catalog, &reader)?;
            Ok(())
        }
        Command::IndexLyrics => {
            let catalog = SqliteAssetCatalog::open(&cfg.meta_db_path)?;
            let reader = DirectoryAssetReader::new(cfg.data_dir.clone());
            assets::lyrics::index_lyrics(&cfg, &catalog, &reader)?;
            Ok(())
        }
        Command::IndexStories => {
            let catalog = SqliteAssetCatalog::open(&cfg.meta_db_path)?;
            let reader = DirectoryAssetReader::new(cfg.data_dir.clone());
            assets::story::index_stories(&cfg, &catalog, &reader)?;
            Ok(())
        }
        Command::IndexAtlas => {
            let catalog = SqliteAssetCatalog::open(&cfg.meta_db_path)?;
            let reader = DirectoryAssetReader::new(cfg.data_dir.clone());
            assets::atlas::index_atlas(&cfg, &catalog, &reader)?;
            Ok(())
        }
        Command::FinalizeAssets => {
            finalize::finalize_assets(&cfg)?;
            Ok(())
        }
        Command::AtlasDiff {
            edited,
            source,
            output,
        } => handle_atlas_diff(&cli, edited, source, output),
        Command::AtlasPatch {
            diff,
            source,
            output,
        } => handle_atlas_patch(&cli, diff, source, output),
    }
}

/// 处理数据库文本索引
fn handle_index_mdb(
    cli: &Cli,
    cfg: &WorkspaceConfig,
    index: &TableIndex,
) -> Result<(), Box<dyn std::error::Error>> {
    if !cfg.master_db_path.exists() {
        return Err(format!("游戏数据库不存在: {:?}", cfg.master_db_path).into());
    }

    let store = SqliteContentStore::open(&cfg.master_db_path)?;
    let summary = intermediate::build_intermediate(cfg, &store, index)?;

    if !cli.quiet {
        println!(
            "共处理 {} 个表，生成 {} 条记录（合并 {} 个重复键）",
            summary.tables, summary.records, summary.deduped_keys
        );
    }

    Ok(())
}

/// 处理数据库翻译输出再生成
fn handle_mdb_output(
    cli: &Cli,
    cfg: &WorkspaceConfig,
    index: &TableIndex,
) -> Result<(), Box<dyn std::error::Error>> {
    intermediate::regenerate_output(cfg, index)?;

    if !cli.quiet {
        println!("翻译输出已写入: {:?}", cfg.mdb_output_dir);
    }

    Ok(())
}

/// 处理贴图diff生成
fn handle_atlas_diff(
    cli: &Cli,
    edited: &PathBuf,
    source: &PathBuf,
    output: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    if !edited.exists() {
        return Err(format!("编辑后的图片不存在: {:?}", edited).into());
    }
    if !source.exists() {
        return Err(format!("原始图片不存在: {:?}", source).into());
    }

    imagediff::create_diff_file(edited, source, output)?;

    if !cli.quiet {
        println!("diff已写入: {:?}", output);
    }

    Ok(())
}

/// 处理贴图还原
fn handle_atlas_patch(
    cli: &Cli,
    diff: &PathBuf,
    source: &PathBuf,
    output: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    if !diff.exists() {
        return Err(format!("diff文件不存在: {:?}", diff).into());
    }
    if !source.exists() {
        return Err(format!("原始图片不存在: {:?}", source).into());
    }

    imagediff::apply_diff_file(diff, source, output)?;

    if !cli.quiet {
        println!("还原结果已写入: {:?}", output);
    }

    Ok(())
}
