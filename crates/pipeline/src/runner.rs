use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use dataexport_core::{
    CourseKey, DbCredentials, ExportError, ExportId, ExportResult, RunConfig, RunState, Stage,
};
use dataexport_infrastructure::{ObjectStorage, ProcessRunner};

use crate::extraction::ExtractionJobDriver;
use crate::packaging::PackagingStage;
use crate::paths::RunPaths;
use crate::source_loader::{SourceDataLoader, SourceStore};
use crate::validation::ValidationStage;

/// 流水线驱动
///
/// 严格顺序执行各阶段，前一阶段完成是后一阶段开始的硬屏障
/// （阶段间通过持久化产物交接，没有内存传递）。第一个失败即终止，
/// 任何阶段不做重试；被中断的运行留下的远端产物依赖命名约定
/// 覆盖安全重跑（重建数据库、覆盖同日归档）。
pub struct PipelineRunner {
    config: RunConfig,
    credentials: DbCredentials,
    source: Arc<dyn SourceStore>,
    process_runner: Arc<dyn ProcessRunner>,
    storage: Arc<ObjectStorage>,
    // UTC日期时钟，测试中可替换以模拟跨UTC午夜的长时间运行
    clock: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
    state: RunState,
}

impl PipelineRunner {
    pub fn new(
        config: RunConfig,
        credentials: DbCredentials,
        source: Arc<dyn SourceStore>,
        process_runner: Arc<dyn ProcessRunner>,
        storage: Arc<ObjectStorage>,
    ) -> Self {
        Self {
            config,
            credentials,
            source,
            process_runner,
            storage,
            clock: Arc::new(|| Utc::now().date_naive()),
            state: RunState::Init,
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// 执行一次完整的流水线运行
    pub async fn run(&mut self) -> ExportResult<RunState> {
        if self.state != RunState::Init {
            return Err(ExportError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: "Init".to_string(),
            });
        }

        let config = self.config.clone();
        let credentials = self.credentials.clone();
        let source = Arc::clone(&self.source);
        let process_runner = Arc::clone(&self.process_runner);
        let storage = Arc::clone(&self.storage);
        let clock = Arc::clone(&self.clock);

        let scratch = tempfile::tempdir()?;
        let paths = RunPaths::create(scratch.path())?;
        let course = CourseKey::parse(&config.course_id);

        info!(
            "流水线开始: identifier={}, course={}",
            config.identifier, config.course_id
        );

        // 1. 源数据装载
        let loader = SourceDataLoader::new(source.as_ref(), &config);
        self.step(Stage::SourceLoad, RunState::DbReady, loader.ensure_database())
            .await?;
        self.step(Stage::SourceLoad, RunState::DataLoaded, loader.load_data())
            .await?;

        // 2. 分布式提取
        let extraction = ExtractionJobDriver::new(process_runner.as_ref(), &config);
        self.step(Stage::Extraction, RunState::Extracted, extraction.submit())
            .await?;

        // 3. 打包与加密
        let packaging = PackagingStage::new(
            process_runner.as_ref(),
            &config,
            &credentials,
            &course,
            &paths,
        );
        self.step(Stage::Packaging, RunState::Packaged, packaging.run())
            .await?;

        // 4. 校验
        // 归档键以打包时刻的UTC日期为准：日期在打包完成后采样，
        // 提取阶段运行数小时跨越UTC午夜时不会定位到错误的归档
        let export_id = ExportId::new(course.org_id(), clock());
        info!("定位交付包: export_id={export_id}");
        let validation = ValidationStage::new(
            process_runner.as_ref(),
            storage.as_ref(),
            &config,
            &course,
            &paths,
        );
        self.step(
            Stage::Validation,
            RunState::Validated,
            validation.run(&export_id),
        )
        .await?;

        info!("流水线完成: identifier={}", config.identifier);
        Ok(self.state.clone())
    }

    async fn step<T>(
        &mut self,
        stage: Stage,
        next: RunState,
        fut: impl Future<Output = ExportResult<T>>,
    ) -> ExportResult<T> {
        info!("阶段[{stage}]开始");
        match fut.await {
            Ok(value) => {
                self.state = self.state.advance(next)?;
                info!("阶段[{stage}]完成, 状态: {:?}", self.state);
                Ok(value)
            }
            Err(e) => {
                error!("阶段[{stage}]失败: {e}");
                if let Ok(failed) = self.state.fail(stage, e.to_string()) {
                    self.state = failed;
                }
                Err(e.at_stage(stage))
            }
        }
    }
}
