use serde::Serialize;

use crate::routes::chapter::model::NormalizedChapterFilters;

/// 章节缓存键前缀
const CHAPTER_PREFIX: &str = "chapters:";

/// 章节缓存键的删除模式，批量上传后整族失效
pub const CHAPTER_KEY_PATTERN: &str = "chapters:*";

/// 生成章节列表缓存键
///
/// 键由归一化之后的过滤参数序列化而来：默认值已填充、字段顺序固定，
/// 因此两个逻辑等价的查询（无论参数顺序或可选字段是否出现）共享同一条缓存。
pub fn chapter_list_key(filters: &NormalizedChapterFilters) -> String {
    let json = serde_json::to_string(filters).expect("filters serialize to json");
    format!("{}{}", CHAPTER_PREFIX, json)
}

/// 生成单个章节的缓存键
pub fn chapter_detail_key(chapter_pid: &str) -> String {
    format!("{}\"{}\"", CHAPTER_PREFIX, chapter_pid)
}

/// 生成上传结果的回显缓存键
///
/// 上传没有产生任何写入时，用计算出的结果键播种一条回显缓存，
/// 避免同一份失败数据反复打到数据库。
pub fn upload_echo_key<T: Serialize>(result: &T) -> String {
    let json = serde_json::to_string(result).unwrap_or_default();
    format!("{}{}", CHAPTER_PREFIX, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::chapter::model::ChapterFilterQuery;

    #[test]
    fn identical_normalized_filters_share_one_key() {
        let explicit = ChapterFilterQuery {
            class: Some("Class 11".to_string()),
            unit: None,
            status: None,
            weak_chapters: None,
            subject: None,
            page: Some(1),
            limit: Some(10),
            sort_by: Some("chapter".to_string()),
            order: Some("asc".to_string()),
        };
        let defaulted = ChapterFilterQuery {
            class: Some("Class 11".to_string()),
            unit: None,
            status: None,
            weak_chapters: None,
            subject: None,
            page: None,
            limit: None,
            sort_by: None,
            order: None,
        };

        let a = chapter_list_key(&explicit.normalize().unwrap());
        let b = chapter_list_key(&defaulted.normalize().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn different_filters_produce_different_keys() {
        let physics = ChapterFilterQuery {
            subject: Some("Physics".to_string()),
            ..Default::default()
        };
        let chemistry = ChapterFilterQuery {
            subject: Some("Chemistry".to_string()),
            ..Default::default()
        };

        let a = chapter_list_key(&physics.normalize().unwrap());
        let b = chapter_list_key(&chemistry.normalize().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn detail_key_quotes_the_pid() {
        assert_eq!(chapter_detail_key("chap_1"), "chapters:\"chap_1\"");
    }
}
