use std::fmt;

use serde::Deserialize;

use crate::errors::{ExportError, ExportResult};

/// 源数据库连接凭据
///
/// 从`credentials_file_url`指向的JSON文档加载，整个运行期间只读。
#[derive(Clone, Deserialize)]
pub struct DbCredentials {
    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl DbCredentials {
    /// 解析凭据JSON文档：`{host, username, password, database}`
    pub fn from_json_slice(bytes: &[u8]) -> ExportResult<Self> {
        let credentials: DbCredentials = serde_json::from_slice(bytes)
            .map_err(|e| ExportError::Configuration(format!("解析凭据文档失败: {e}")))?;
        credentials.validate()?;
        Ok(credentials)
    }

    fn validate(&self) -> ExportResult<()> {
        for (name, value) in [
            ("host", &self.host),
            ("username", &self.username),
            ("database", &self.database),
        ] {
            if value.is_empty() {
                return Err(ExportError::Configuration(format!(
                    "凭据文档缺少必填字段: {name}"
                )));
            }
        }
        Ok(())
    }
}

// 不在Debug输出中泄漏密码
impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials_document() {
        let doc = br#"{
            "host": "db.example.com",
            "username": "acceptance",
            "password": "secret",
            "database": "acceptance_export"
        }"#;
        let credentials = DbCredentials::from_json_slice(doc).unwrap();
        assert_eq!(credentials.host, "db.example.com");
        assert_eq!(credentials.username, "acceptance");
        assert_eq!(credentials.database, "acceptance_export");
    }

    #[test]
    fn test_missing_field_is_configuration_error() {
        let doc = br#"{"host": "db", "username": "u", "password": "p"}"#;
        let err = DbCredentials::from_json_slice(doc).unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
    }

    #[test]
    fn test_debug_does_not_leak_password() {
        let doc = br#"{"host": "db", "username": "u", "password": "hunter2", "database": "d"}"#;
        let credentials = DbCredentials::from_json_slice(doc).unwrap();
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
