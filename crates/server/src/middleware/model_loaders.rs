use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::{DBService, models::task::Task, query::TaskScope};

use crate::{AppContext, error::ApiError};

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl ModelLoaderDeps for AppContext {
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

/// Ids are positive integers; anything else cannot name a row.
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

async fn fetch_model_or_error<M, E, Fut>(
    model_name: &'static str,
    model_id: i64,
    not_found: &'static str,
    load_future: Fut,
) -> Result<M, ApiError>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(ApiError::NotFound(not_found.to_string()))
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(ApiError::Internal(format!("Failed to fetch {model_name}")))
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: i64,
    not_found: &'static str,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_error(model_name, model_id, not_found, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

async fn load_task_in_scope<S>(
    deps: &S,
    raw_id: &str,
    scope: TaskScope,
    not_found: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    let Some(task_id) = parse_id(raw_id) else {
        tracing::warn!(raw_id, "Rejecting malformed task id");
        return Err(ApiError::NotFound(not_found.to_string()));
    };
    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        not_found,
        Task::find_by_id(&deps.db_service().pool, task_id, scope),
    )
    .await
}

/// Loads a task that has not been soft-deleted.
pub async fn load_task_middleware<S>(
    State(deps): State<S>,
    Path(task_id): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_task_in_scope(
        &deps,
        &task_id,
        TaskScope::Active,
        "Task not found",
        request,
        next,
    )
    .await
}

/// Loads a task only if it is in the trash.
pub async fn load_trashed_task_middleware<S>(
    State(deps): State<S>,
    Path(task_id): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_task_in_scope(
        &deps,
        &task_id,
        TaskScope::Trashed,
        "Task not found or not deleted",
        request,
        next,
    )
    .await
}
