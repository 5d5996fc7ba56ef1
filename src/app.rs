use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use dataexport_core::{DbCredentials, RunConfig, RunState};
use dataexport_infrastructure::{read_url, ObjectStorage, SourceDatabase, TokioProcessRunner};
use dataexport_pipeline::PipelineRunner;

/// 主应用程序：装配依赖并驱动一次流水线运行
pub struct Application {
    config: RunConfig,
}

impl Application {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<RunState> {
        // 凭据通过URL获取，不内联在配置或命令行中
        let credentials_bytes = read_url(&self.config.credentials_file_url)
            .await
            .with_context(|| {
                format!("读取凭据文档失败: {}", self.config.credentials_file_url)
            })?;
        let credentials =
            DbCredentials::from_json_slice(&credentials_bytes).context("解析凭据文档失败")?;
        info!("数据库凭据已加载: host={}", credentials.host);

        let source = Arc::new(SourceDatabase::new(credentials.clone()));
        let process_runner = Arc::new(TokioProcessRunner);
        let storage = Arc::new(
            ObjectStorage::for_bucket(&self.config.exporter_output_bucket)
                .context("创建输出桶客户端失败")?,
        );

        let mut runner = PipelineRunner::new(
            self.config.clone(),
            credentials,
            source,
            process_runner,
            storage,
        );
        let state = runner.run().await?;
        Ok(state)
    }
}
