//! 测试共用的Mock实现与构造辅助

use std::path::Path;

/// 在本地对象存储根目录下预置一个对象（键映射为相对路径）
pub fn seed_object(root: &Path, key: &str, bytes: &[u8]) -> std::io::Result<()> {
    let path = root.join(key);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

pub mod mocks {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use dataexport_core::{ExportError, ExportResult};
    use dataexport_infrastructure::{ProcessCommand, ProcessOutput, ProcessRunner};

    use crate::source_loader::SourceStore;

    type Handler = Box<dyn Fn(&ProcessCommand) -> ExportResult<ProcessOutput> + Send + Sync>;

    /// 可编程的进程执行Mock
    ///
    /// 按program名称注册处理函数；未注册的program默认成功返回空输出。
    /// 记录全部调用供断言。
    #[derive(Default)]
    pub struct MockProcessRunner {
        invocations: Mutex<Vec<ProcessCommand>>,
        handlers: Mutex<HashMap<String, Handler>>,
    }

    impl MockProcessRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_handler<F>(self, program: impl Into<String>, handler: F) -> Self
        where
            F: Fn(&ProcessCommand) -> ExportResult<ProcessOutput> + Send + Sync + 'static,
        {
            self.handlers
                .lock()
                .unwrap()
                .insert(program.into(), Box::new(handler));
            self
        }

        /// program一律失败（模拟外部工具非零退出）
        pub fn failing(self, program: impl Into<String>, code: i32) -> Self {
            let program = program.into();
            let display = program.clone();
            self.with_handler(program, move |_| {
                Err(ExportError::ProcessFailed {
                    command: display.clone(),
                    code: Some(code),
                    stderr: "mock failure".to_string(),
                })
            })
        }

        pub fn invocations(&self) -> Vec<ProcessCommand> {
            self.invocations.lock().unwrap().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.invocations()
                .into_iter()
                .map(|command| command.program)
                .collect()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run(&self, command: &ProcessCommand) -> ExportResult<ProcessOutput> {
            self.invocations.lock().unwrap().push(command.clone());
            let handlers = self.handlers.lock().unwrap();
            match handlers.get(&command.program) {
                Some(handler) => handler(command),
                None => Ok(ProcessOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                }),
            }
        }
    }

    /// 源数据库Mock：记录调用，可配置装载失败
    #[derive(Default)]
    pub struct MockSourceStore {
        ensure_calls: Mutex<usize>,
        loaded_fixtures: Mutex<Vec<PathBuf>>,
        load_error: Option<String>,
    }

    impl MockSourceStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_load(message: impl Into<String>) -> Self {
            Self {
                load_error: Some(message.into()),
                ..Self::default()
            }
        }

        pub fn ensure_calls(&self) -> usize {
            *self.ensure_calls.lock().unwrap()
        }

        pub fn loaded_fixtures(&self) -> Vec<PathBuf> {
            self.loaded_fixtures.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceStore for MockSourceStore {
        async fn ensure_database(&self) -> ExportResult<()> {
            *self.ensure_calls.lock().unwrap() += 1;
            Ok(())
        }

        async fn load_fixture(&self, path: &Path) -> ExportResult<()> {
            if let Some(ref message) = self.load_error {
                return Err(ExportError::InvalidSqlStatement {
                    line: 1,
                    message: message.clone(),
                });
            }
            self.loaded_fixtures.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }
}
