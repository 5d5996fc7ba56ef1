use std::path::Path;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::{debug, info};

use dataexport_core::{DbCredentials, ExportError, ExportResult};

/// 源MySQL数据库访问
///
/// 流水线只在装载阶段直接接触数据库；提取阶段由远端集群
/// 自行读取数据库，不经过本驱动。
pub struct SourceDatabase {
    credentials: DbCredentials,
}

impl SourceDatabase {
    pub fn new(credentials: DbCredentials) -> Self {
        Self { credentials }
    }

    async fn connect(&self, with_database: bool) -> ExportResult<MySqlConnection> {
        let mut options = MySqlConnectOptions::new()
            .host(&self.credentials.host)
            .username(&self.credentials.username)
            .password(&self.credentials.password);
        if with_database {
            options = options.database(&self.credentials.database);
        }
        let connection = options.connect().await?;
        Ok(connection)
    }

    /// 确保目标数据库存在（不存在则创建，不影响其他数据库）
    pub async fn ensure_database_exists(&self) -> ExportResult<()> {
        let mut connection = self.connect(false).await?;
        let statement = format!(
            "CREATE DATABASE IF NOT EXISTS {}",
            self.credentials.database
        );
        connection.execute(statement.as_str()).await?;
        connection.close().await?;
        info!("目标数据库已就绪: {}", self.credentials.database);
        Ok(())
    }

    /// 按文件顺序执行SQL脚本中的语句
    ///
    /// 任何执行错误立即中止并携带出错行号；fixture视为可信输入，
    /// 不做重试。
    pub async fn execute_sql_file(&self, path: &Path) -> ExportResult<()> {
        let content = tokio::fs::read_to_string(path).await?;
        let statements = parse_statements(&content)?;

        let mut connection = self.connect(true).await?;
        for (line, statement) in statements {
            debug!("执行SQL脚本第{line}行");
            connection.execute(statement).await.map_err(|e| {
                ExportError::InvalidSqlStatement {
                    line,
                    message: e.to_string(),
                }
            })?;
        }
        connection.close().await?;
        info!("SQL脚本执行完成: {}", path.display());
        Ok(())
    }
}

/// 最小化的SQL脚本行解析
///
/// 不使用MySQL原生的脚本解析机制：跳过空行和`--`注释行，
/// 其余每一行视为一条完整语句，且必须以`;`结尾。
/// 跨行语句不受支持，其第一行会因缺少终结符而立即报错，
/// 错误中带有1起始的行号。
pub fn parse_statements(content: &str) -> ExportResult<Vec<(usize, &str)>> {
    let mut statements = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("--") {
            continue;
        }
        if !line.ends_with(';') {
            return Err(ExportError::InvalidSqlStatement {
                line: line_number,
                message: "语句未以`;`结尾（不支持跨行语句）".to_string(),
            });
        }
        statements.push((line_number, raw_line.trim_end()));
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let script = "-- header comment\n\nDROP TABLE IF EXISTS t;\n\nCREATE TABLE t (id INT);\n";
        let statements = parse_statements(script).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], (3, "DROP TABLE IF EXISTS t;"));
        assert_eq!(statements[1], (5, "CREATE TABLE t (id INT);"));
    }

    #[test]
    fn test_unterminated_statement_fails_at_offending_line() {
        let script = "DROP TABLE IF EXISTS t;\nINSERT INTO t\nVALUES (1);\n";
        let err = parse_statements(script).unwrap_err();
        match err {
            ExportError::InvalidSqlStatement { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_statements_keep_file_order() {
        let script = "A;\nB;\nC;\n";
        let statements = parse_statements(script).unwrap();
        let order: Vec<&str> = statements.iter().map(|(_, s)| *s).collect();
        assert_eq!(order, vec!["A;", "B;", "C;"]);
    }
}
