use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::entities::chapter::{ChapterEntity, FailedChapter, NewChapter};
use crate::utils::{generate_public_id, id_prefixes};

const CHAPTER_COLUMNS: &str = "chapter_pid, subject, chapter, \"class\", unit, status, \
     is_weak_chapter, year_wise_question_count, question_solved, created_at, updated_at";

/// 章节列表查询条件，已归一化（默认值填充完毕）
#[derive(Debug, Clone)]
pub struct ChapterListFilters {
    pub class: Option<String>,
    pub unit: Option<String>,
    pub status: Option<String>,
    pub is_weak_chapter: Option<bool>,
    pub subject: Option<String>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: String,
    pub order: String,
}

/// 章节存储库实现
pub struct ChapterRepository;

impl ChapterRepository {
    /// 按条件分页查询章节，返回当前页和总数
    pub async fn list(
        pool: &PgPool,
        filters: &ChapterListFilters,
    ) -> Result<(Vec<ChapterEntity>, i64), sqlx::Error> {
        let mut count_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM chapters WHERE deleted_at IS NULL",
        );
        Self::apply_filters(&mut count_query, filters);
        let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM chapters WHERE deleted_at IS NULL",
            CHAPTER_COLUMNS
        ));
        Self::apply_filters(&mut query, filters);

        // 排序列经过白名单映射，绝不直接拼接用户输入
        let column = match filters.sort_by.as_str() {
            "questionSolved" => "question_solved",
            _ => "chapter",
        };
        let direction = if filters.order == "desc" { "DESC" } else { "ASC" };
        query.push(format!(" ORDER BY {} {}", column, direction));

        let page = filters.page.max(1) as i64;
        query
            .push(" LIMIT ")
            .push_bind(filters.limit as i64)
            .push(" OFFSET ")
            .push_bind((page - 1) * filters.limit as i64);

        let chapters = query
            .build_query_as::<ChapterEntity>()
            .fetch_all(pool)
            .await?;

        Ok((chapters, total))
    }

    fn apply_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &ChapterListFilters) {
        if let Some(class) = &filters.class {
            query.push(" AND \"class\" = ").push_bind(class.clone());
        }
        if let Some(unit) = &filters.unit {
            query.push(" AND unit = ").push_bind(unit.clone());
        }
        if let Some(status) = &filters.status {
            query.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(weak) = filters.is_weak_chapter {
            query.push(" AND is_weak_chapter = ").push_bind(weak);
        }
        if let Some(subject) = &filters.subject {
            query.push(" AND subject = ").push_bind(subject.clone());
        }
    }

    /// 根据公开ID查找章节
    pub async fn find_by_pid(
        pool: &PgPool,
        chapter_pid: &str,
    ) -> Result<Option<ChapterEntity>, sqlx::Error> {
        let chapter = sqlx::query_as::<_, ChapterEntity>(&format!(
            "SELECT {} FROM chapters WHERE chapter_pid = $1 AND deleted_at IS NULL",
            CHAPTER_COLUMNS
        ))
        .bind(chapter_pid)
        .fetch_one(pool)
        .await;

        match chapter {
            Ok(chapter) => Ok(Some(chapter)),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 批量插入章节
    ///
    /// 逐项校验，校验失败的条目收集返回，合法条目整批插入。
    pub async fn bulk_insert(
        pool: &PgPool,
        items: &[NewChapter],
    ) -> Result<(u64, Vec<FailedChapter>), sqlx::Error> {
        let mut failed = Vec::new();
        let mut valid = Vec::new();

        for item in items {
            match item.validate() {
                Ok(()) => valid.push(item.clone()),
                Err(error) => failed.push(FailedChapter {
                    chapter: item.clone(),
                    error,
                }),
            }
        }

        if valid.is_empty() {
            return Ok((0, failed));
        }

        let now = Utc::now();
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO chapters (chapter_pid, subject, chapter, \"class\", unit, status, \
             is_weak_chapter, year_wise_question_count, question_solved, created_at, updated_at) ",
        );
        query.push_values(valid.iter(), |mut row, item| {
            row.push_bind(generate_public_id(id_prefixes::CHAPTER))
                .push_bind(item.subject.clone())
                .push_bind(item.chapter.clone())
                .push_bind(item.class.clone())
                .push_bind(item.unit.clone())
                .push_bind(item.status.clone())
                .push_bind(item.is_weak_chapter)
                .push_bind(Json(item.year_wise_question_count.clone()))
                .push_bind(item.question_solved)
                .push_bind(now)
                .push_bind(now);
        });

        let result = query.build().execute(pool).await?;
        tracing::info!(
            "Inserted {} chapters, {} failed validation",
            result.rows_affected(),
            failed.len()
        );

        Ok((result.rows_affected(), failed))
    }
}
