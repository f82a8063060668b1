pub mod assets;
pub mod batch;
pub mod config;
pub mod finalize;
pub mod hashing;
pub mod imagediff;
pub mod index_tree;
pub mod intermediate;
pub mod reader;
pub mod record;
pub mod store;
pub mod utils;

// 重新导出主要结构
pub use config::{TableIndex, WorkspaceConfig};
pub use index_tree::{LeafEntry, Node};
pub use reader::{AssetReader, DirectoryAssetReader};
pub use record::{TranslationRecord, SCHEMA_VERSION};
pub use store::{AssetCatalog, AssetRow, ContentStore, SqliteAssetCatalog, SqliteContentStore};
pub use utils::TlError;
