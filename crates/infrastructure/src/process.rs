use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use dataexport_core::{ExportError, ExportResult};

/// 一次外部进程调用的完整描述
#[derive(Debug, Clone, Default)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// 完整命令行形式，用于日志和错误信息
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// 进程执行结果（仅成功时返回，非零退出码直接转为错误）
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// 进程执行抽象
///
/// 流水线把远端任务提交工具和遗留导出器当作不透明的外部协作方，
/// 通过该trait调用，测试中以Mock替换。
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &ProcessCommand) -> ExportResult<ProcessOutput>;
}

/// 基于tokio::process的真实进程执行器
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &ProcessCommand) -> ExportResult<ProcessOutput> {
        info!("执行外部命令: {}", command.display_line());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(ref dir) = command.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &command.envs {
            cmd.env(key, value);
        }

        let output = cmd.output().await.map_err(|e| ExportError::ProcessFailed {
            command: command.display_line(),
            code: None,
            stderr: format!("启动进程失败: {e}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            error!(
                "外部命令失败: {} (退出码: {:?})",
                command.display_line(),
                output.status.code()
            );
            return Err(ExportError::ProcessFailed {
                command: command.display_line(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(ProcessOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = TokioProcessRunner;
        let command = ProcessCommand::new("sh").args(["-c", "echo hello"]);
        let output = runner.run(&command).await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_process_failed() {
        let runner = TokioProcessRunner;
        let command = ProcessCommand::new("sh").args(["-c", "echo oops >&2; exit 3"]);
        let err = runner.run(&command).await.unwrap_err();
        match err {
            ExportError::ProcessFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("oops"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_process_failed() {
        let runner = TokioProcessRunner;
        let command = ProcessCommand::new("definitely-not-a-real-binary");
        assert!(matches!(
            runner.run(&command).await,
            Err(ExportError::ProcessFailed { .. })
        ));
    }

    #[test]
    fn test_display_line() {
        let command = ProcessCommand::new("exporter")
            .arg("--bucket")
            .arg("exports");
        assert_eq!(command.display_line(), "exporter --bucket exports");
    }
}
