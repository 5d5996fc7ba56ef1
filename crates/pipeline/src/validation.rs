use std::path::{Path, PathBuf};

use tracing::{info, warn};

use dataexport_core::models::{archive_key, encrypted_entry, exported_filename};
use dataexport_core::{CourseKey, ExportError, ExportId, ExportResult, RunConfig};
use dataexport_infrastructure::{ObjectStorage, ProcessCommand, ProcessRunner};

use crate::paths::RunPaths;

/// 校验阶段
///
/// 按确定性的键定位交付包：键只依赖(组织ID, UTC日期)和运行前缀，
/// 不依赖打包阶段的任何内部状态，因此校验可以单独幂等重跑。
/// 归档缺失是显式的"产物不存在"失败而不是存储客户端异常。
///
/// 上游的提取/打包阶段对行顺序不做任何保证（并行worker各自写出），
/// 比较前先对行排序，使校验结果与内部顺序无关。
pub struct ValidationStage<'a> {
    runner: &'a dyn ProcessRunner,
    storage: &'a ObjectStorage,
    config: &'a RunConfig,
    course: &'a CourseKey,
    paths: &'a RunPaths,
}

impl<'a> ValidationStage<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        storage: &'a ObjectStorage,
        config: &'a RunConfig,
        course: &'a CourseKey,
        paths: &'a RunPaths,
    ) -> Self {
        Self {
            runner,
            storage,
            config,
            course,
            paths,
        }
    }

    /// 期望的归档键：`<output_prefix><org>-<date>.zip`
    pub fn archive_key(&self, export_id: &ExportId) -> String {
        archive_key(&self.config.output_prefix(), export_id)
    }

    pub async fn run(&self, export_id: &ExportId) -> ExportResult<()> {
        let validation_dir = self.paths.working_dir.join("validation");
        tokio::fs::create_dir_all(&validation_dir).await?;

        // 1. 定位并下载归档
        let key = self.archive_key(export_id);
        if self.storage.lookup(&key).await?.is_none() {
            warn!("交付包不存在: {}", self.storage.url_for(&key));
            return Err(ExportError::ArtifactNotFound {
                url: self.storage.url_for(&key),
            });
        }
        let archive_path = validation_dir.join(export_id.archive_name());
        self.storage.download(&key, &archive_path).await?;

        // 2. 解压
        self.runner
            .run(
                &ProcessCommand::new("unzip")
                    .arg(archive_path.display().to_string())
                    .arg("-d")
                    .arg(validation_dir.display().to_string()),
            )
            .await?;

        // 3. 解密：专用密钥环导入验收密钥后解密单表文件
        let gpg_dir = self.prepare_gpg_home().await?;
        let filename = exported_filename(self.course, &self.config.table, &self.config.environment);
        let encrypted_path = validation_dir.join(encrypted_entry(export_id, &filename));
        let decrypted_path = validation_dir.join(&filename);

        self.runner
            .run(
                &ProcessCommand::new("gpg")
                    .arg("--homedir")
                    .arg(gpg_dir.display().to_string())
                    .arg("--import")
                    .arg(
                        Path::new(&self.config.gpg_keys_dir)
                            .join("insecure_secret.key")
                            .display()
                            .to_string(),
                    ),
            )
            .await?;
        self.runner
            .run(
                &ProcessCommand::new("gpg")
                    .arg("--homedir")
                    .arg(gpg_dir.display().to_string())
                    .arg("--output")
                    .arg(decrypted_path.display().to_string())
                    .arg("--decrypt")
                    .arg(encrypted_path.display().to_string()),
            )
            .await?;

        // 4. 归一化（排序）后与期望fixture比较
        let sorted_path = PathBuf::from(format!("{}.sorted", decrypted_path.display()));
        let actual = normalize_file(&decrypted_path).await?;
        tokio::fs::write(&sorted_path, actual.join("\n") + "\n").await?;

        let expected_path = PathBuf::from(&self.config.data_dir)
            .join("output")
            .join(format!("{filename}.sorted"));
        let expected = normalize_file(&expected_path).await?;

        let diff = diff_lines(&actual, &expected);
        if !diff.is_empty() {
            return Err(ExportError::ValidationMismatch {
                actual_path: sorted_path.display().to_string(),
                expected_path: expected_path.display().to_string(),
                diff,
            });
        }

        info!("导出内容校验通过: {}", sorted_path.display());
        Ok(())
    }

    /// 创建0700权限的专用GPG目录
    async fn prepare_gpg_home(&self) -> ExportResult<PathBuf> {
        let gpg_dir = self.paths.working_dir.join("gnupg");
        tokio::fs::create_dir_all(&gpg_dir).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&gpg_dir, std::fs::Permissions::from_mode(0o700)).await?;
        }
        Ok(gpg_dir)
    }
}

/// 读取文件并按行排序
pub async fn normalize_file(path: &Path) -> ExportResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(normalize_lines(&content))
}

/// 行排序归一化：相同的行多重集合在任何顺序下归一化结果相同
pub fn normalize_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    lines.sort();
    lines
}

/// 比较两份已排序的行集合，返回差异描述（空串表示一致）
///
/// `<`开头的行仅出现在实际输出中，`>`开头的行仅出现在期望输出中。
pub fn diff_lines(actual: &[String], expected: &[String]) -> String {
    let mut diff = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < actual.len() || j < expected.len() {
        match (actual.get(i), expected.get(j)) {
            (Some(a), Some(e)) if a == e => {
                i += 1;
                j += 1;
            }
            (Some(a), Some(e)) if a < e => {
                diff.push(format!("< {a}"));
                i += 1;
            }
            (Some(_), Some(e)) => {
                diff.push(format!("> {e}"));
                j += 1;
            }
            (Some(a), None) => {
                diff.push(format!("< {a}"));
                i += 1;
            }
            (None, Some(e)) => {
                diff.push(format!("> {e}"));
                j += 1;
            }
            (None, None) => unreachable!(),
        }
    }
    diff.join("\n")
}
