use axum::{
    Extension, Router,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::{
    DbErr, TransactionTrait,
    models::{task::Task, task_tag::TaskTag},
    query::{Page, TaskListParams, TaskQuery, TaskScope, parse_page},
    validation::TaskDraft,
};
use serde_json::{Map, Value};
use utils::response::{ApiResponse, Pagination};

use crate::{
    AppContext,
    error::ApiError,
    middleware::{load_task_middleware, load_trashed_task_middleware},
};

/// Decoded query pairs in request order.
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// A JSON object body; an empty body counts as `{}`.
fn parse_body(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(err) => Err(ApiError::BadRequest(format!("Invalid JSON body: {err}"))),
    }
}

/// Removes `tags` from the body. `None` means tags were not supplied.
fn take_tags(body: &mut Map<String, Value>) -> Option<Vec<String>> {
    match body.remove("tags")? {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        other => {
            tracing::warn!(value = %other, "Ignoring non-array tags field");
            None
        }
    }
}

fn page_response(page: Page<Task>) -> ApiResponse<Vec<Task>> {
    let pagination = Pagination {
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages(),
    };
    ApiResponse::paginated(page.items, pagination)
}

async fn reload_task(db: &db::DbPool, task_id: i64, scope: TaskScope) -> Result<Task, ApiError> {
    Task::find_by_id(db, task_id, scope)
        .await?
        .ok_or(ApiError::Database(DbErr::RecordNotFound(
            "Task not found".to_string(),
        )))
}

pub async fn get_tasks(
    State(ctx): State<AppContext>,
    pairs: QueryPairs,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let Query(pairs) = pairs?;
    let query = TaskQuery::from(TaskListParams::from_pairs(pairs));
    let page = Task::list(&ctx.db().pool, &query, TaskScope::Active, ctx.page_size()).await?;
    Ok(ResponseJson(page_response(page)))
}

pub async fn get_trash(
    State(ctx): State<AppContext>,
    pairs: QueryPairs,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let Query(pairs) = pairs?;
    let params = TaskListParams::from_pairs(pairs);
    let query = TaskQuery::trash(parse_page(params.page.as_deref()));
    let page = Task::list(&ctx.db().pool, &query, TaskScope::Trashed, ctx.page_size()).await?;
    Ok(ResponseJson(page_response(page)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let mut body = parse_body(&body)?;
    let tags = take_tags(&mut body);
    let draft = TaskDraft::default().apply(&body)?;

    tracing::debug!("Creating task '{}'", draft.title);

    let pool = &ctx.db().pool;
    let tx = pool.begin().await?;
    let task = Task::create(&tx, &draft).await?;
    if let Some(tags) = &tags {
        TaskTag::replace_for_task(&tx, task.id, tags).await?;
    }
    tx.commit().await?;

    let task = reload_task(pool, task.id, TaskScope::Active).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(
            task,
            "Task created successfully",
        )),
    ))
}

pub async fn update_task(
    Extension(existing): Extension<Task>,
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let mut body = parse_body(&body)?;
    let tags = take_tags(&mut body);
    let draft = TaskDraft::from(&existing).apply(&body)?;

    tracing::debug!(task_id = existing.id, tags_supplied = tags.is_some(), "Updating task");

    let pool = &ctx.db().pool;
    let tx = pool.begin().await?;
    Task::update(&tx, existing.id, &draft).await?;
    if let Some(tags) = &tags {
        TaskTag::replace_for_task(&tx, existing.id, tags).await?;
    }
    tx.commit().await?;

    let task = reload_task(pool, existing.id, TaskScope::Active).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        task,
        "Task updated successfully",
    )))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(ctx): State<AppContext>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    match Task::soft_delete(&ctx.db().pool, task.id).await {
        Ok(0) => Err(ApiError::task_not_found()),
        Ok(_) => {
            tracing::info!(task_id = task.id, "Moved task to trash");
            Ok(ResponseJson(ApiResponse::message("Task deleted successfully")))
        }
        Err(err) => {
            tracing::error!(task_id = task.id, error = %err, "Failed to soft-delete task");
            Err(ApiError::operation_failed("Failed to delete task"))
        }
    }
}

pub async fn toggle_task_status(
    Extension(task): Extension<Task>,
    State(ctx): State<AppContext>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    const FAILED: &str = "Failed to update task status";

    if let Err(errors) = TaskDraft::from(&task).validate() {
        tracing::warn!(task_id = task.id, "Stored task fails validation; status unchanged");
        return Err(ApiError::OperationFailed {
            message: FAILED.to_string(),
            errors: Some(errors),
        });
    }

    let next = task.status.next();
    let pool = &ctx.db().pool;
    match Task::set_status(pool, task.id, next).await {
        Ok(_) => {}
        Err(DbErr::RecordNotFound(_)) => return Err(ApiError::task_not_found()),
        Err(err) => {
            tracing::error!(task_id = task.id, error = %err, "Failed to toggle task status");
            return Err(ApiError::operation_failed(FAILED));
        }
    }

    tracing::debug!(task_id = task.id, from = %task.status, to = %next, "Toggled task status");
    let task = reload_task(pool, task.id, TaskScope::Active).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        task,
        "Task status updated successfully",
    )))
}

pub async fn restore_task(
    Extension(task): Extension<Task>,
    State(ctx): State<AppContext>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let pool = &ctx.db().pool;
    match Task::restore(pool, task.id).await {
        Ok(0) => {
            return Err(ApiError::NotFound(
                "Task not found or not deleted".to_string(),
            ));
        }
        Ok(_) => tracing::info!(task_id = task.id, "Restored task from trash"),
        Err(err) => {
            tracing::error!(task_id = task.id, error = %err, "Failed to restore task");
            return Err(ApiError::operation_failed("Failed to restore task"));
        }
    }

    let task = reload_task(pool, task.id, TaskScope::Active).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        task,
        "Task restored successfully",
    )))
}

pub fn router(ctx: &AppContext) -> Router<AppContext> {
    let active_task = from_fn_with_state(ctx.clone(), load_task_middleware::<AppContext>);
    let trashed_task =
        from_fn_with_state(ctx.clone(), load_trashed_task_middleware::<AppContext>);

    Router::new()
        .route("/tasks", get(get_tasks).post(create_task))
        .route("/tasks/trash", get(get_trash))
        .route(
            "/tasks/{task_id}",
            get(get_task)
                .put(update_task)
                .delete(delete_task)
                .route_layer(active_task.clone()),
        )
        .route(
            "/tasks/{task_id}/toggle-status",
            patch(toggle_task_status).route_layer(active_task),
        )
        .route(
            "/tasks/{task_id}/restore",
            patch(restore_task).route_layer(trashed_task),
        )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        assert!(parse_body(&Bytes::from_static(b"")).unwrap().is_empty());
        assert!(parse_body(&Bytes::from_static(b"  \n")).unwrap().is_empty());
        assert!(matches!(
            parse_body(&Bytes::from_static(b"[1]")),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_body(&Bytes::from_static(b"{oops")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn tags_are_taken_out_of_the_body() {
        let mut body = object(json!({ "title": "Tagged task", "tags": ["a", 7, null, {"x": 1}] }));
        assert_eq!(take_tags(&mut body), Some(vec!["a".to_string(), "7".to_string()]));
        assert!(!body.contains_key("tags"));

        let mut body = object(json!({ "tags": null }));
        assert_eq!(take_tags(&mut body), None);

        let mut body = object(json!({ "tags": "a,b" }));
        assert_eq!(take_tags(&mut body), None);

        let mut body = object(json!({ "title": "No tags here" }));
        assert_eq!(take_tags(&mut body), None);
    }
}
