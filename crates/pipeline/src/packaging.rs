use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use dataexport_core::config::{
    EnvironmentConfig, ExporterConfig, ExporterDefaults, OrganizationConfig,
};
use dataexport_core::{CourseKey, DbCredentials, ExportResult, RunConfig};
use dataexport_infrastructure::{ProcessCommand, ProcessRunner};

use crate::paths::RunPaths;

/// 打包与加密阶段
///
/// 为遗留导出器生成类型化的配置文档，调用导出器完成
/// 打包、按组织接收者加密和上传。归档的键由(组织ID, UTC日期)
/// 决定，同一天重复打包会覆盖之前的归档。
/// 导出器任何非零退出都是致命错误，不存在部分成功。
pub struct PackagingStage<'a> {
    runner: &'a dyn ProcessRunner,
    config: &'a RunConfig,
    credentials: &'a DbCredentials,
    course: &'a CourseKey,
    paths: &'a RunPaths,
}

impl<'a> PackagingStage<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        config: &'a RunConfig,
        credentials: &'a DbCredentials,
        course: &'a CourseKey,
        paths: &'a RunPaths,
    ) -> Self {
        Self {
            runner,
            config,
            credentials,
            course,
            paths,
        }
    }

    /// 生成导出器配置文档（defaults/environments/organizations三个命名空间）
    pub fn exporter_config(&self) -> ExporterConfig {
        ExporterConfig {
            options: BTreeMap::new(),
            defaults: ExporterDefaults {
                gpg_keys: self.config.gpg_keys_dir.clone(),
                sql_user: self.credentials.username.clone(),
                sql_db: self.credentials.database.clone(),
                sql_password: self.credentials.password.clone(),
            },
            environments: BTreeMap::from([(
                self.config.environment.clone(),
                EnvironmentConfig {
                    name: format!("{}-analytics", self.config.environment),
                    sql_host: self.credentials.host.clone(),
                    external_files: self.paths.external_files_dir.display().to_string(),
                },
            )]),
            organizations: BTreeMap::from([(
                self.course.org_id().to_string(),
                OrganizationConfig {
                    recipient: self.config.gpg_recipient.clone(),
                },
            )]),
        }
    }

    /// 配置文档写入位置：`<scratch根>/<environment>.yml`
    pub fn config_path(&self) -> PathBuf {
        self.paths
            .root
            .join(format!("{}.yml", self.config.environment))
    }

    /// 构造导出器调用命令
    pub fn command(&self, config_path: &Path) -> ProcessCommand {
        let config = self.config;
        ProcessCommand::new(&config.exporter_bin)
            .arg("--work-dir")
            .arg(self.paths.working_dir.display().to_string())
            .arg("--bucket")
            .arg(&config.exporter_output_bucket)
            .arg("--course-id")
            .arg(&config.course_id)
            .arg("--external-prefix")
            .arg(config.task_output_root())
            .arg("--output-prefix")
            .arg(config.output_prefix())
            .arg(config_path.display().to_string())
            .arg("--env")
            .arg(&config.environment)
            .arg("--org")
            .arg(self.course.org_id())
            .arg("--task")
            .arg(&config.task_name)
    }

    pub async fn run(&self) -> ExportResult<()> {
        let config_path = self.config_path();
        let document = self.exporter_config();
        document.validate()?;
        tokio::fs::write(&config_path, document.to_yaml()?).await?;
        info!("导出器配置已写入: {}", config_path.display());

        // 导出器要求该目录预先存在
        tokio::fs::create_dir_all(self.paths.working_dir.join("course-data")).await?;

        self.runner.run(&self.command(&config_path)).await?;
        Ok(())
    }
}
