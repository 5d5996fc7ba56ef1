use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ExportError, ExportResult};

/// 遗留导出器的配置文档（YAML）
///
/// 三个命名空间：全局`defaults`、按环境的`environments`、
/// 按组织的`organizations`。字段在构造/加载时即校验，
/// 而不是在使用时按字符串键取值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub options: BTreeMap<String, serde_yaml::Value>,
    pub defaults: ExporterDefaults,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    pub organizations: BTreeMap<String, OrganizationConfig>,
}

/// 全局默认值：密钥环位置和SQL连接参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterDefaults {
    pub gpg_keys: String,
    pub sql_user: String,
    pub sql_db: String,
    pub sql_password: String,
}

/// 单个环境的源文件位置和显示名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    pub sql_host: String,
    pub external_files: String,
}

/// 单个组织的加密接收者
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub recipient: String,
}

impl ExporterConfig {
    /// 序列化为YAML文档
    pub fn to_yaml(&self) -> ExportResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ExportError::Serialization(format!("序列化导出器配置失败: {e}")))
    }

    /// 从YAML文档加载并校验
    pub fn from_yaml(text: &str) -> ExportResult<Self> {
        let config: ExporterConfig = serde_yaml::from_str(text)
            .map_err(|e| ExportError::Serialization(format!("解析导出器配置失败: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验所有必填字段非空，且至少配置了一个环境和一个组织
    pub fn validate(&self) -> ExportResult<()> {
        for (name, value) in [
            ("defaults.gpg_keys", &self.defaults.gpg_keys),
            ("defaults.sql_user", &self.defaults.sql_user),
            ("defaults.sql_db", &self.defaults.sql_db),
        ] {
            if value.is_empty() {
                return Err(ExportError::Configuration(format!(
                    "导出器配置缺少必填字段: {name}"
                )));
            }
        }

        if self.environments.is_empty() {
            return Err(ExportError::Configuration(
                "导出器配置必须至少包含一个环境".to_string(),
            ));
        }
        for (env, environment) in &self.environments {
            if environment.name.is_empty()
                || environment.sql_host.is_empty()
                || environment.external_files.is_empty()
            {
                return Err(ExportError::Configuration(format!(
                    "环境[{env}]的配置不完整"
                )));
            }
        }

        if self.organizations.is_empty() {
            return Err(ExportError::Configuration(
                "导出器配置必须至少包含一个组织".to_string(),
            ));
        }
        for (org, organization) in &self.organizations {
            if organization.recipient.is_empty() {
                return Err(ExportError::Configuration(format!(
                    "组织[{org}]缺少recipient"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExporterConfig {
        ExporterConfig {
            options: BTreeMap::new(),
            defaults: ExporterDefaults {
                gpg_keys: "gpg-keys".to_string(),
                sql_user: "acceptance".to_string(),
                sql_db: "acceptance_export".to_string(),
                sql_password: "secret".to_string(),
            },
            environments: BTreeMap::from([(
                "acceptance".to_string(),
                EnvironmentConfig {
                    name: "acceptance-analytics".to_string(),
                    sql_host: "db.example.com".to_string(),
                    external_files: "/tmp/export/external".to_string(),
                },
            )]),
            organizations: BTreeMap::from([(
                "edx".to_string(),
                OrganizationConfig {
                    recipient: "daemon@edx.org".to_string(),
                },
            )]),
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = sample();
        let yaml = config.to_yaml().unwrap();
        let parsed = ExporterConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.defaults.sql_user, "acceptance");
        assert_eq!(
            parsed.environments["acceptance"].name,
            "acceptance-analytics"
        );
        assert_eq!(parsed.organizations["edx"].recipient, "daemon@edx.org");
    }

    #[test]
    fn test_parses_legacy_document_shape() {
        // 与遗留导出器期望的文档结构保持一致
        let text = r#"
options: {}

defaults:
  gpg_keys: gpg-keys
  sql_user: acceptance
  sql_db: acceptance_export
  sql_password: secret

environments:
  acceptance:
    name: acceptance-analytics
    sql_host: db.example.com
    external_files: /tmp/export/external

organizations:
  edx:
    recipient: daemon@edx.org
"#;
        let config = ExporterConfig::from_yaml(text).unwrap();
        assert_eq!(config.environments.len(), 1);
        assert_eq!(config.organizations.len(), 1);
    }

    #[test]
    fn test_empty_environments_rejected() {
        let mut config = sample();
        config.environments.clear();
        assert!(matches!(
            config.validate(),
            Err(ExportError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_recipient_rejected() {
        let mut config = sample();
        config
            .organizations
            .insert("mitx".to_string(), OrganizationConfig {
                recipient: String::new(),
            });
        assert!(config.validate().is_err());
    }
}
