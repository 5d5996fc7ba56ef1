use tracing::info;

use dataexport_core::models::url_path_join;
use dataexport_core::{ExportResult, RunConfig};
use dataexport_infrastructure::{ProcessCommand, ProcessRunner};

/// 分布式提取任务驱动
///
/// 向远端计算集群提交命名的提取工作流并阻塞等待其终止。
/// 集群自行读取源数据库（不经过本驱动），同时写出两份数据：
/// - 中间输出（`<task_output_root>/intermediate`）：多课程交错，仅供集群内部使用
/// - 最终输出（`<task_output_root>/<environment>`）：按环境后缀命名，供下游消费
///
/// 两个位置分离使得重跑提取不会扰动已经校验过的最终产物；
/// 凭据以URL传递而非内联，避免泄漏到进程列表。
pub struct ExtractionJobDriver<'a> {
    runner: &'a dyn ProcessRunner,
    config: &'a RunConfig,
}

impl<'a> ExtractionJobDriver<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &'a RunConfig) -> Self {
        Self { runner, config }
    }

    /// 构造远端任务提交命令（纯函数，单测直接断言参数）
    pub fn command(&self) -> ProcessCommand {
        let config = self.config;
        let output_root = url_path_join(&config.task_output_root(), &[&config.environment]);
        let dump_root = url_path_join(&config.task_output_root(), &["intermediate"]);

        ProcessCommand::new(&config.remote_task_bin)
            .arg("--job-flow-name")
            .arg(&config.job_flow_name)
            .arg("--branch")
            .arg(&config.tasks_branch)
            .arg("--repo")
            .arg(&config.tasks_repo)
            .arg("--remote-name")
            .arg(&config.identifier)
            .arg("--wait")
            .arg("--log-path")
            .arg(&config.tasks_log_path)
            .arg("--user")
            .arg(&config.connection_user)
            .arg(&config.workflow)
            .arg("--local-scheduler")
            .arg("--credentials")
            .arg(&config.credentials_file_url)
            .arg("--dump-root")
            .arg(dump_root)
            .arg("--output-root")
            .arg(output_root)
            .arg("--output-suffix")
            .arg(&config.environment)
            .arg("--num-mappers")
            .arg(config.num_mappers.to_string())
            .arg("--n-reduce-tasks")
            .arg(config.num_reducers.to_string())
    }

    /// 提交工作流并等待终止；远端非零退出即失败
    pub async fn submit(&self) -> ExportResult<()> {
        info!(
            "提交提取工作流: workflow={}, job_flow={}",
            self.config.workflow, self.config.job_flow_name
        );
        self.runner.run(&self.command()).await?;
        Ok(())
    }
}
