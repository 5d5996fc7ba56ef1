use std::fmt;

use chrono::NaiveDate;

use crate::models::CourseKey;

/// 交付包标识：`<org_id>-<YYYY-MM-DD>`（UTC日期）
///
/// 同一组织在同一UTC日期内的重复打包产生相同的标识，
/// 对应的归档会被覆盖而不是追加。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportId {
    org_id: String,
    date: NaiveDate,
}

impl ExportId {
    pub fn new(org_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            org_id: org_id.into(),
            date,
        }
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// 归档文件名：`<export_id>.zip`
    pub fn archive_name(&self) -> String {
        format!("{self}.zip")
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.org_id, self.date.format("%Y-%m-%d"))
    }
}

/// 单表导出文件名：`<safe_course_id>-<table>-<environment>-analytics.sql`
pub fn exported_filename(course: &CourseKey, table: &str, environment: &str) -> String {
    format!(
        "{safe_course_id}-{table}-{environment}-analytics.sql",
        safe_course_id = course.safe_id(),
    )
}

/// 归档在对象存储中的键：`<output_prefix><org_id>-<date>.zip`
///
/// 键完全由(组织ID, 日期)决定，打包阶段和校验阶段各自独立计算，
/// 无需在阶段间传递任何运行时句柄。
pub fn archive_key(output_prefix: &str, export_id: &ExportId) -> String {
    format!("{output_prefix}{}", export_id.archive_name())
}

/// 归档内单表加密文件的条目路径：`<export_id>/<filename>.gpg`
pub fn encrypted_entry(export_id: &ExportId, filename: &str) -> String {
    format!("{export_id}/{filename}.gpg")
}

/// 拼接URL路径片段，避免产生重复的`/`
pub fn url_path_join(base: &str, parts: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for part in parts {
        url.push('/');
        url.push_str(part.trim_matches('/'));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_export_id_display() {
        let id = ExportId::new("edx", date(2014, 7, 1));
        assert_eq!(id.to_string(), "edx-2014-07-01");
        assert_eq!(id.archive_name(), "edx-2014-07-01.zip");
    }

    #[test]
    fn test_exported_filename() {
        let course = CourseKey::parse("edX/E929/2014_T1");
        assert_eq!(
            exported_filename(&course, "courseware_studentmodule", "acceptance"),
            "edX-E929-2014_T1-courseware_studentmodule-acceptance-analytics.sql"
        );
    }

    #[test]
    fn test_archive_key_is_deterministic() {
        let a = ExportId::new("edx", date(2014, 7, 1));
        let b = ExportId::new("edx", date(2014, 7, 1));
        assert_eq!(
            archive_key("automation/run-1/", &a),
            archive_key("automation/run-1/", &b)
        );
        assert_eq!(
            archive_key("automation/run-1/", &a),
            "automation/run-1/edx-2014-07-01.zip"
        );
    }

    #[test]
    fn test_archive_key_differs_across_dates() {
        let a = ExportId::new("edx", date(2014, 7, 1));
        let b = ExportId::new("edx", date(2014, 7, 2));
        assert_ne!(archive_key("p/", &a), archive_key("p/", &b));
    }

    #[test]
    fn test_encrypted_entry() {
        let id = ExportId::new("edx", date(2014, 7, 1));
        assert_eq!(
            encrypted_entry(&id, "edX-E929-2014_T1-courseware_studentmodule-acceptance-analytics.sql"),
            "edx-2014-07-01/edX-E929-2014_T1-courseware_studentmodule-acceptance-analytics.sql.gpg"
        );
    }

    #[test]
    fn test_url_path_join() {
        assert_eq!(
            url_path_join("s3://bucket/root/", &["intermediate"]),
            "s3://bucket/root/intermediate"
        );
        assert_eq!(
            url_path_join("s3://bucket/root", &["a", "b"]),
            "s3://bucket/root/a/b"
        );
    }
}
