//! Post API handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::posts::DEFAULT_LIST_LIMIT;
use crate::domain::entities::PostId;

use super::error::ApiError;
use super::models::*;
use super::state::ApiState;

fn parse_post_id(raw: &str) -> Result<PostId, ApiError> {
    match raw.trim().parse::<PostId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::invalid_id(raw)),
    }
}

/// Missing, malformed or non-positive limits fall back to the default.
fn parse_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
        .unwrap_or(DEFAULT_LIST_LIMIT)
}

/// Missing, malformed or negative offsets fall back to zero.
fn parse_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|value| u64::try_from(value).ok())
        .unwrap_or(0)
}

fn required_param(raw: Option<String>, message: &'static str) -> Result<String, ApiError> {
    match raw {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::bad_request(message, None)),
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
    })
}

pub async fn create_post(
    State(state): State<ApiState>,
    payload: Result<Json<PostCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let post = state.posts.create_post(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageDataResponse {
            message: "Post created successfully",
            data: post,
        }),
    ))
}

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = parse_limit(query.limit.as_deref());
    let offset = parse_offset(query.offset.as_deref());

    let posts = state.posts.list_posts(limit, offset).await?;

    Ok(Json(PostListResponse {
        total: posts.len(),
        data: posts,
        limit,
        offset,
    }))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&raw_id)?;
    let post = state.posts.get_post(id).await?;
    Ok(Json(PostResponse { data: post }))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<PostUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&raw_id)?;
    let request = json_body(payload)?;
    let post = state.posts.update_post(id, request.into()).await?;

    Ok(Json(MessageDataResponse {
        message: "Post updated successfully",
        data: post,
    }))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_post_id(&raw_id)?;
    state.posts.delete_post(id).await?;
    Ok(Json(MessageResponse {
        message: "Post deleted successfully",
    }))
}

pub async fn search_by_tag(
    State(state): State<ApiState>,
    Query(query): Query<TagQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = required_param(query.tag, "Tag parameter is required")?;
    let posts = state.posts.find_by_tag(&tag).await?;

    Ok(Json(TagSearchResponse {
        total: posts.len(),
        data: posts,
    }))
}

pub async fn search_posts(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = required_param(query.q, "Query parameter is required")?;
    let results = state.posts.search_posts(&q).await?;
    Ok(Json(SearchResponse { data: results }))
}
