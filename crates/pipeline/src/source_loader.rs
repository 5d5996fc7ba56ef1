use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use dataexport_core::{ExportResult, RunConfig};
use dataexport_infrastructure::SourceDatabase;

/// 源数据库操作的抽象，测试中以Mock替换真实MySQL
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// 确保目标数据库存在（create-if-absent）
    async fn ensure_database(&self) -> ExportResult<()>;

    /// 执行fixture中的SQL语句，替换目标表内容
    async fn load_fixture(&self, path: &std::path::Path) -> ExportResult<()>;
}

#[async_trait]
impl SourceStore for SourceDatabase {
    async fn ensure_database(&self) -> ExportResult<()> {
        self.ensure_database_exists().await
    }

    async fn load_fixture(&self, path: &std::path::Path) -> ExportResult<()> {
        self.execute_sql_file(path).await
    }
}

/// 源数据装载阶段
///
/// 从已知fixture建立确定性的初始状态。fixture自身负责
/// 重建目标表（drop + create + insert），因此重复运行是幂等的：
/// 无论之前表中有什么，装载后的内容等于fixture的内容。
pub struct SourceDataLoader<'a> {
    store: &'a dyn SourceStore,
    config: &'a RunConfig,
}

impl<'a> SourceDataLoader<'a> {
    pub fn new(store: &'a dyn SourceStore, config: &'a RunConfig) -> Self {
        Self { store, config }
    }

    /// fixture文件路径：`<data_dir>/input/load_<table>.sql`
    pub fn fixture_path(&self) -> PathBuf {
        PathBuf::from(&self.config.data_dir)
            .join("input")
            .join(format!("load_{}.sql", self.config.table))
    }

    pub async fn ensure_database(&self) -> ExportResult<()> {
        self.store.ensure_database().await
    }

    pub async fn load_data(&self) -> ExportResult<()> {
        let path = self.fixture_path();
        info!("装载源数据fixture: {}", path.display());
        self.store.load_fixture(&path).await
    }
}
