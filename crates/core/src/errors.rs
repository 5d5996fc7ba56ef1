use thiserror::Error;

use crate::models::Stage;

/// 导出流水线错误类型定义
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("对象存储错误: {0}")]
    Storage(#[from] object_store::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("外部进程失败: {command} (退出码: {code:?})\n{stderr}")]
    ProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("预期的导出产物不存在: {url}")]
    ArtifactNotFound { url: String },

    #[error("SQL脚本第{line}行无效: {message}")]
    InvalidSqlStatement { line: usize, message: String },

    #[error("导出内容校验失败: actual={actual_path}, expected={expected_path}\n{diff}")]
    ValidationMismatch {
        actual_path: String,
        expected_path: String,
        diff: String,
    },

    #[error("无效的流水线状态迁移: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("阶段[{stage}]执行失败: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    /// 将底层错误包装为带阶段信息的终态错误
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            // 已经带阶段信息的错误不再重复包装
            ExportError::StageFailed { .. } => self,
            other => ExportError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// 错误发生的阶段（仅终态错误携带）
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ExportError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// 统一的Result类型
pub type ExportResult<T> = std::result::Result<T, ExportError>;
