use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// 章节状态枚举值
pub const CHAPTER_STATUSES: [&str; 3] = ["Not Started", "In Progress", "Completed"];

/// 章节数据库实体
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChapterEntity {
    pub chapter_pid: String,
    pub subject: String,
    pub chapter: String,
    pub class: String,
    pub unit: String,
    pub status: String,
    pub is_weak_chapter: bool,
    /// 各年份真题数量，如 {"2019": 0, "2020": 2}
    pub year_wise_question_count: Json<BTreeMap<String, i64>>,
    pub question_solved: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待插入的章节数据，批量上传的输入项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChapter {
    pub subject: String,
    pub chapter: String,
    pub class: String,
    pub unit: String,
    #[serde(rename = "yearWiseQuestionCount")]
    pub year_wise_question_count: BTreeMap<String, i64>,
    #[serde(rename = "questionSolved")]
    pub question_solved: i64,
    pub status: String,
    #[serde(rename = "isWeakChapter")]
    pub is_weak_chapter: bool,
}

impl NewChapter {
    /// 逐项校验，失败的条目不阻断整批插入
    pub fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject is required".to_string());
        }
        if self.chapter.trim().is_empty() {
            return Err("chapter is required".to_string());
        }
        if self.class.trim().is_empty() {
            return Err("class is required".to_string());
        }
        if self.unit.trim().is_empty() {
            return Err("unit is required".to_string());
        }
        if !CHAPTER_STATUSES.contains(&self.status.as_str()) {
            return Err(format!(
                "status must be one of: {}",
                CHAPTER_STATUSES.join(", ")
            ));
        }
        if self.question_solved < 0 {
            return Err("questionSolved must not be negative".to_string());
        }
        Ok(())
    }
}

/// 批量上传中校验失败的条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedChapter {
    pub chapter: NewChapter,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_chapter() -> NewChapter {
        NewChapter {
            subject: "Physics".to_string(),
            chapter: "Rotational Motion".to_string(),
            class: "Class 11".to_string(),
            unit: "Mechanics 1".to_string(),
            year_wise_question_count: BTreeMap::from([("2020".to_string(), 2)]),
            question_solved: 0,
            status: "Not Started".to_string(),
            is_weak_chapter: false,
        }
    }

    #[test]
    fn accepts_valid_chapter() {
        assert!(valid_chapter().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_status() {
        let mut chapter = valid_chapter();
        chapter.status = "Done".to_string();
        assert!(chapter.validate().is_err());
    }

    #[test]
    fn rejects_empty_subject() {
        let mut chapter = valid_chapter();
        chapter.subject = "  ".to_string();
        assert!(chapter.validate().is_err());
    }
}
