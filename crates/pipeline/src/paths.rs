use std::path::{Path, PathBuf};

use dataexport_core::ExportResult;

/// 单次运行的本地临时目录布局
///
/// `external/`供导出器读取外部文件，`work/`是导出器和校验阶段
/// 的工作目录。运行结束后整个根目录随临时目录一起删除。
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub external_files_dir: PathBuf,
    pub working_dir: PathBuf,
}

impl RunPaths {
    pub fn create(root: &Path) -> ExportResult<Self> {
        let external_files_dir = root.join("external");
        let working_dir = root.join("work");
        std::fs::create_dir_all(&external_files_dir)?;
        std::fs::create_dir_all(&working_dir)?;
        Ok(Self {
            root: root.to_path_buf(),
            external_files_dir,
            working_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_builds_layout() {
        let dir = TempDir::new().unwrap();
        let paths = RunPaths::create(dir.path()).unwrap();
        assert!(paths.external_files_dir.is_dir());
        assert!(paths.working_dir.is_dir());
    }
}
