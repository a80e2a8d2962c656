use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::entities::chapter::{
    CHAPTER_STATUSES, ChapterEntity, FailedChapter, NewChapter,
};
use crate::database::repositories::chapter::ChapterListFilters;

/// 列表接口的原始查询参数，全部可选
#[derive(Debug, Default, Deserialize)]
pub struct ChapterFilterQuery {
    pub class: Option<String>,
    pub unit: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "weakChapters")]
    pub weak_chapters: Option<String>,
    pub subject: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// 归一化后的查询条件
///
/// 默认值已填充、字段顺序固定，其序列化结果直接充当缓存键的主体，
/// 因此逻辑等价的两次查询必然得到同一个键。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedChapterFilters {
    pub class: Option<String>,
    pub unit: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "weakChapters")]
    pub weak_chapters: Option<bool>,
    pub subject: Option<String>,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: String,
    pub order: String,
}

impl ChapterFilterQuery {
    /// 校验并填充默认值：page=1、limit=10、sortBy=chapter、order=asc
    pub fn normalize(self) -> Result<NormalizedChapterFilters, String> {
        if let Some(status) = &self.status {
            if !CHAPTER_STATUSES.contains(&status.as_str()) {
                return Err(format!(
                    "status must be one of: {}",
                    CHAPTER_STATUSES.join(", ")
                ));
            }
        }

        let weak_chapters = match self.weak_chapters.as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(_) => return Err("weakChapters must be \"true\" or \"false\"".to_string()),
        };

        let order = match self.order {
            None => "asc".to_string(),
            Some(order) if order == "asc" || order == "desc" => order,
            Some(_) => return Err("order must be \"asc\" or \"desc\"".to_string()),
        };

        Ok(NormalizedChapterFilters {
            class: self.class,
            unit: self.unit,
            status: self.status,
            weak_chapters,
            subject: self.subject,
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(10).clamp(1, 100),
            sort_by: self.sort_by.unwrap_or_else(|| "chapter".to_string()),
            order,
        })
    }
}

impl NormalizedChapterFilters {
    pub fn to_list_filters(&self) -> ChapterListFilters {
        ChapterListFilters {
            class: self.class.clone(),
            unit: self.unit.clone(),
            status: self.status.clone(),
            is_weak_chapter: self.weak_chapters,
            subject: self.subject.clone(),
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            order: self.order.clone(),
        }
    }
}

/// 章节详情响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDetails {
    pub chapter_id: String,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChapterEntity> for ChapterDetails {
    fn from(entity: ChapterEntity) -> Self {
        ChapterDetails {
            chapter_id: entity.chapter_pid,
            subject: entity.subject,
            chapter: entity.chapter,
            class: entity.class,
            unit: entity.unit,
            year_wise_question_count: entity.year_wise_question_count.0,
            question_solved: entity.question_solved,
            status: entity.status,
            is_weak_chapter: entity.is_weak_chapter,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// 章节列表响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterListResponse {
    pub total: i64,
    pub chapters: Vec<ChapterDetails>,
}

/// 批量上传请求体，兼容裸数组和 {"chapters": [...]} 两种形式
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChapterUploadBody {
    Wrapped { chapters: Vec<NewChapter> },
    List(Vec<NewChapter>),
}

impl ChapterUploadBody {
    pub fn into_items(self) -> Vec<NewChapter> {
        match self {
            ChapterUploadBody::Wrapped { chapters } => chapters,
            ChapterUploadBody::List(chapters) => chapters,
        }
    }
}

/// 批量上传响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterUploadResponse {
    #[serde(rename = "uploadedCount")]
    pub uploaded_count: u64,
    #[serde(rename = "failedChapters")]
    pub failed_chapters: Vec<FailedChapter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_defaults() {
        let filters = ChapterFilterQuery::default().normalize().unwrap();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.limit, 10);
        assert_eq!(filters.sort_by, "chapter");
        assert_eq!(filters.order, "asc");
    }

    #[test]
    fn normalize_rejects_bad_status() {
        let query = ChapterFilterQuery {
            status: Some("Finished".to_string()),
            ..Default::default()
        };
        assert!(query.normalize().is_err());
    }

    #[test]
    fn normalize_parses_weak_chapters_flag() {
        let query = ChapterFilterQuery {
            weak_chapters: Some("true".to_string()),
            ..Default::default()
        };
        assert_eq!(query.normalize().unwrap().weak_chapters, Some(true));

        let query = ChapterFilterQuery {
            weak_chapters: Some("yes".to_string()),
            ..Default::default()
        };
        assert!(query.normalize().is_err());
    }

    #[test]
    fn upload_body_accepts_both_shapes() {
        let bare: ChapterUploadBody = serde_json::from_str(
            r#"[{"subject":"Physics","chapter":"Units","class":"Class 11","unit":"Mechanics 1",
                "yearWiseQuestionCount":{"2020":1},"questionSolved":0,
                "status":"Not Started","isWeakChapter":false}]"#,
        )
        .unwrap();
        assert_eq!(bare.into_items().len(), 1);

        let wrapped: ChapterUploadBody = serde_json::from_str(
            r#"{"chapters":[{"subject":"Physics","chapter":"Units","class":"Class 11",
                "unit":"Mechanics 1","yearWiseQuestionCount":{},"questionSolved":0,
                "status":"Completed","isWeakChapter":true}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_items().len(), 1);
    }
}
