use serde::{Deserialize, Serialize};

/// 课程复合标识（组织ID + 课程ID）
///
/// 组织ID由课程ID字符串确定性推导：取第一个`/`之前的部分并小写。
/// 文件名中使用"安全"形式的课程ID，即把所有`/`替换为`-`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseKey {
    course_id: String,
    org_id: String,
}

impl CourseKey {
    /// 从课程ID字符串推导课程标识
    pub fn parse(course_id: &str) -> Self {
        let org_id = course_id
            .split('/')
            .next()
            .unwrap_or(course_id)
            .to_lowercase();
        Self {
            course_id: course_id.to_string(),
            org_id,
        }
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// 路径安全形式的课程ID，用于推导文件名
    pub fn safe_id(&self) -> String {
        self.course_id.replace('/', "-")
    }
}
