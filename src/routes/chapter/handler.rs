use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    cache::keys::chapter_keys,
    cache::operations::{chapter::ChapterCacheOperations, read_through},
    database::repositories::chapter::ChapterRepository,
    middleware::authorize_admin,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{
    ChapterDetails, ChapterFilterQuery, ChapterListResponse, ChapterUploadBody,
    ChapterUploadResponse,
};

/// 单章节读取的回源错误
enum ChapterLoadError {
    NotFound,
    Db(sqlx::Error),
}

/// 章节列表，带过滤、分页、排序，走旁路缓存
#[axum::debug_handler]
pub async fn get_chapters(
    State(state): State<AppState>,
    Query(query): Query<ChapterFilterQuery>,
) -> Response {
    let filters = match query.normalize() {
        Ok(filters) => filters,
        Err(msg) => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response::<ChapterListResponse>(error_codes::VALIDATION_ERROR, msg),
            )
                .into_response();
        }
    };

    let cache_key = chapter_keys::chapter_list_key(&filters);
    let result = read_through(
        &state.store,
        &cache_key,
        state.config.cache_ttl().as_secs(),
        || async {
            let (chapters, total) =
                ChapterRepository::list(&state.pool, &filters.to_list_filters()).await?;
            tracing::info!("Fetched {} chapters from database", chapters.len());
            Ok::<_, sqlx::Error>(ChapterListResponse {
                total,
                chapters: chapters.into_iter().map(ChapterDetails::from).collect(),
            })
        },
    )
    .await;

    match result {
        Ok(response) => (StatusCode::OK, success_to_api_response(response)).into_response(),
        Err(e) => {
            tracing::error!("Error fetching chapters: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<ChapterListResponse>(
                    error_codes::INTERNAL_ERROR,
                    "Failed to fetch chapters".to_string(),
                ),
            )
                .into_response()
        }
    }
}

/// 按公开ID读取单个章节，走旁路缓存
#[axum::debug_handler]
pub async fn get_chapter_by_id(
    State(state): State<AppState>,
    Path(chapter_id): Path<String>,
) -> Response {
    let cache_key = chapter_keys::chapter_detail_key(&chapter_id);
    let result = read_through(
        &state.store,
        &cache_key,
        state.config.cache_ttl().as_secs(),
        || async {
            match ChapterRepository::find_by_pid(&state.pool, &chapter_id).await {
                Ok(Some(chapter)) => Ok(ChapterDetails::from(chapter)),
                Ok(None) => Err(ChapterLoadError::NotFound),
                Err(e) => Err(ChapterLoadError::Db(e)),
            }
        },
    )
    .await;

    match result {
        Ok(chapter) => (StatusCode::OK, success_to_api_response(chapter)).into_response(),
        Err(ChapterLoadError::NotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response::<ChapterDetails>(
                error_codes::NOT_FOUND,
                "Chapter not found".to_string(),
            ),
        )
            .into_response(),
        Err(ChapterLoadError::Db(e)) => {
            tracing::error!("Error fetching chapter {}: {}", chapter_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<ChapterDetails>(
                    error_codes::INTERNAL_ERROR,
                    "Failed to fetch chapter".to_string(),
                ),
            )
                .into_response()
        }
    }
}

/// 批量上传章节（仅管理员）
///
/// 产生写入后对整个章节缓存族做失效；零写入时播种回显缓存，
/// 防止同一批失败数据反复穿透到数据库。
#[axum::debug_handler]
pub async fn upload_chapters(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<axum::Json<ChapterUploadBody>, axum::extract::rejection::JsonRejection>,
) -> Response {
    if let Err(rejection) = authorize_admin::<ChapterUploadResponse>(&headers, &state.config) {
        return rejection.into_response();
    }

    let items = match body {
        Ok(axum::Json(body)) => body.into_items(),
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response::<ChapterUploadResponse>(
                    error_codes::VALIDATION_ERROR,
                    format!("Invalid JSON body: {}", e),
                ),
            )
                .into_response();
        }
    };

    match ChapterRepository::bulk_insert(&state.pool, &items).await {
        Ok((uploaded_count, failed_chapters)) => {
            let response = ChapterUploadResponse {
                uploaded_count,
                failed_chapters,
            };

            if uploaded_count > 0 {
                ChapterCacheOperations::invalidate_chapters(&state.store).await;
            } else {
                // 同一批失败数据重复上传时直接返回回显缓存，首次才播种
                if let Some(cached) =
                    ChapterCacheOperations::get_upload_echo(&state.store, &response).await
                {
                    return (StatusCode::CREATED, success_to_api_response(cached))
                        .into_response();
                }
                ChapterCacheOperations::seed_upload_echo(
                    &state.store,
                    &response,
                    state.config.cache_ttl().as_secs(),
                )
                .await;
            }

            (StatusCode::CREATED, success_to_api_response(response)).into_response()
        }
        Err(e) => {
            tracing::error!("Error uploading chapters: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<ChapterUploadResponse>(
                    error_codes::INTERNAL_ERROR,
                    "Failed to upload chapters".to_string(),
                ),
            )
                .into_response()
        }
    }
}
