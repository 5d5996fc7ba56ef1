use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::models::url_path_join;

/// 单次流水线运行的配置
///
/// 加载顺序：
/// 1. 默认配置
/// 2. 配置文件（TOML格式）
/// 3. 环境变量覆盖（前缀: DATAEXPORT_）
///
/// 运行开始前一次性加载并校验，之后不再变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// 运行标识，用于隔离并发运行的远端产物；
    /// 相同标识允许复用远端已缓存的执行环境
    pub identifier: String,
    /// 远端计算集群（job flow）名称
    pub job_flow_name: String,
    /// 提取代码仓库URL
    pub tasks_repo: String,
    /// 提取代码分支
    pub tasks_branch: String,
    /// 远端日志路径
    pub tasks_log_path: String,
    /// SSH连接用户
    pub connection_user: String,
    /// 提取输出根URL（目录）
    pub tasks_output_url: String,
    /// 数据库凭据JSON文档的URL（传URL而非内联密钥，
    /// 避免凭据泄漏到进程列表或日志中）
    pub credentials_file_url: String,
    /// 交付包上传的S3桶
    pub exporter_output_bucket: String,
    /// 远端任务提交CLI路径
    pub remote_task_bin: String,
    /// 遗留导出器CLI路径
    pub exporter_bin: String,
    /// 远端提取工作流类名
    pub workflow: String,
    /// 遗留导出器任务名
    pub task_name: String,
    /// Mapper数量
    pub num_mappers: u32,
    /// Reducer数量
    pub num_reducers: u32,
    /// 环境名（参与输出文件命名）
    pub environment: String,
    /// 目标表名
    pub table: String,
    /// 课程ID
    pub course_id: String,
    /// GPG密钥环目录
    pub gpg_keys_dir: String,
    /// 交付包加密接收者
    pub gpg_recipient: String,
    /// 输入/期望输出fixture所在目录
    pub data_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            job_flow_name: String::new(),
            tasks_repo: String::new(),
            tasks_branch: String::new(),
            tasks_log_path: String::new(),
            connection_user: String::new(),
            tasks_output_url: String::new(),
            credentials_file_url: String::new(),
            exporter_output_bucket: String::new(),
            remote_task_bin: "remote-task".to_string(),
            exporter_bin: "exporter".to_string(),
            workflow: "StudentModulePerCourseAfterImportWorkflow".to_string(),
            task_name: "StudentModuleTask".to_string(),
            num_mappers: 4,
            num_reducers: 2,
            environment: "acceptance".to_string(),
            table: "courseware_studentmodule".to_string(),
            course_id: "edX/E929/2014_T1".to_string(),
            gpg_keys_dir: "gpg-keys".to_string(),
            gpg_recipient: "daemon@edx.org".to_string(),
            data_dir: "data".to_string(),
        }
    }
}

impl RunConfig {
    /// 从配置文件和环境变量加载运行配置
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&RunConfig::default()).context("构建默认配置失败")?);

        // 1. 配置文件
        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/dataexport.toml", "dataexport.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        // 2. 环境变量覆盖（前缀: DATAEXPORT_）- 最高优先级
        // 配置结构是扁平的，不设置嵌套分隔符
        builder = builder.add_source(Environment::with_prefix("DATAEXPORT").try_parsing(true));

        let config: RunConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// 从TOML字符串加载运行配置
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置有效性：在产生任何副作用之前发现缺失的必填项
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("identifier", &self.identifier),
            ("job_flow_name", &self.job_flow_name),
            ("tasks_repo", &self.tasks_repo),
            ("tasks_branch", &self.tasks_branch),
            ("tasks_log_path", &self.tasks_log_path),
            ("connection_user", &self.connection_user),
            ("tasks_output_url", &self.tasks_output_url),
            ("credentials_file_url", &self.credentials_file_url),
            ("exporter_output_bucket", &self.exporter_output_bucket),
            ("remote_task_bin", &self.remote_task_bin),
            ("exporter_bin", &self.exporter_bin),
            ("workflow", &self.workflow),
            ("task_name", &self.task_name),
            ("environment", &self.environment),
            ("table", &self.table),
            ("course_id", &self.course_id),
            ("gpg_keys_dir", &self.gpg_keys_dir),
            ("gpg_recipient", &self.gpg_recipient),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(anyhow::anyhow!("缺少必填配置项: {name}"));
            }
        }

        if self.num_mappers == 0 {
            return Err(anyhow::anyhow!("num_mappers必须大于0"));
        }
        if self.num_reducers == 0 {
            return Err(anyhow::anyhow!("num_reducers必须大于0"));
        }

        Ok(())
    }

    /// 本次运行的提取输出根：`<tasks_output_url>/<identifier>`
    pub fn task_output_root(&self) -> String {
        url_path_join(&self.tasks_output_url, &[&self.identifier])
    }

    /// 交付包上传前缀：`automation/<identifier>/`
    pub fn output_prefix(&self) -> String {
        format!("automation/{}/", self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_toml() -> String {
        r#"
            identifier = "run-42"
            job_flow_name = "acceptance-flow"
            tasks_repo = "https://example.com/analytics-tasks.git"
            tasks_branch = "release"
            tasks_log_path = "/var/log/analytics-tasks"
            connection_user = "hadoop"
            tasks_output_url = "s3://acceptance-output/tasks"
            credentials_file_url = "s3://acceptance-secrets/credentials.json"
            exporter_output_bucket = "acceptance-exports"
        "#
        .to_string()
    }

    #[test]
    fn test_from_toml_applies_defaults() {
        let config = RunConfig::from_toml(&valid_toml()).unwrap();
        assert_eq!(config.environment, "acceptance");
        assert_eq!(config.table, "courseware_studentmodule");
        assert_eq!(config.workflow, "StudentModulePerCourseAfterImportWorkflow");
        assert_eq!(config.num_mappers, 4);
        assert_eq!(config.num_reducers, 2);
    }

    #[test]
    fn test_derived_locations() {
        let config = RunConfig::from_toml(&valid_toml()).unwrap();
        assert_eq!(
            config.task_output_root(),
            "s3://acceptance-output/tasks/run-42"
        );
        assert_eq!(config.output_prefix(), "automation/run-42/");
    }

    #[test]
    fn test_missing_required_field_is_rejected_eagerly() {
        let toml_str = valid_toml().replace("identifier = \"run-42\"", "identifier = \"\"");
        let err = RunConfig::from_toml(&toml_str).unwrap_err();
        assert!(err.to_string().contains("identifier"));
    }

    #[test]
    fn test_zero_mappers_rejected() {
        let mut toml_str = valid_toml();
        toml_str.push_str("num_mappers = 0\n");
        assert!(RunConfig::from_toml(&toml_str).is_err());
    }
}
