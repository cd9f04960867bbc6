use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QuerySelect, RelationTrait, Set, sea_query::Expr,
};
use serde::Serialize;

use super::{tag::Tag, task_tag::TaskTag};
pub use crate::types::{TaskPriority, TaskStatus};
use crate::{
    entities::{tag, task, task_tag},
    query::{Page, TaskQuery, TaskScope},
    validation::TaskDraft,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
        }
    }
}

impl Task {
    fn from_model(model: task::Model, tags: Vec<Tag>) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            deleted_at: model.deleted_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            tags,
        }
    }

    async fn with_tags<C: ConnectionTrait>(
        db: &C,
        models: Vec<task::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut tags = TaskTag::tags_for_tasks(db, &ids).await?;
        Ok(models
            .into_iter()
            .map(|model| {
                let task_tags = tags.remove(&model.id).unwrap_or_default();
                Self::from_model(model, task_tags)
            })
            .collect())
    }

    async fn find_model<C: ConnectionTrait>(
        db: &C,
        id: i64,
        scope: TaskScope,
    ) -> Result<Option<task::Model>, DbErr> {
        task::Entity::find_by_id(id)
            .filter(scope.condition())
            .one(db)
            .await
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i64,
        scope: TaskScope,
    ) -> Result<Option<Self>, DbErr> {
        match Self::find_model(db, id, scope).await? {
            Some(model) => Ok(Self::with_tags(db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Filtered, ordered page of tasks inside `scope`.
    pub async fn list<C: ConnectionTrait>(
        db: &C,
        query: &TaskQuery,
        scope: TaskScope,
        page_size: u64,
    ) -> Result<Page<Self>, DbErr> {
        let mut select = task::Entity::find()
            .filter(scope.condition())
            .filter(query.filter.condition());

        if let Some(tag_name) = &query.filter.tag {
            select = select
                .join(JoinType::InnerJoin, task::Relation::TaskTag.def())
                .join(JoinType::InnerJoin, task_tag::Relation::Tag.def())
                .filter(tag::Column::Name.eq(tag_name.as_str()));
        }

        let total = select.clone().count(db).await?;
        let models = query
            .apply_order(select)
            .offset(Page::<Self>::offset(query.page, page_size))
            .limit(Page::<Self>::limit(page_size))
            .all(db)
            .await?;

        Ok(Page {
            items: Self::with_tags(db, models).await?,
            total,
            page: query.page,
            page_size,
        })
    }

    /// Inserts a task row. Tags are reconciled separately.
    pub async fn create<C: ConnectionTrait>(db: &C, draft: &TaskDraft) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = task::ActiveModel {
            title: Set(draft.title.clone()),
            description: Set(draft.description.clone()),
            status: Set(draft.status),
            priority: Set(draft.priority),
            due_date: Set(draft.due_date),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model, Vec::new()))
    }

    /// Overwrites the writable fields of an active task.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        draft: &TaskDraft,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id, TaskScope::Active)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        active.title = Set(draft.title.clone());
        active.description = Set(draft.description.clone());
        active.status = Set(draft.status);
        active.priority = Set(draft.priority);
        active.due_date = Set(draft.due_date);
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated, Vec::new()))
    }

    pub async fn set_status<C: ConnectionTrait>(
        db: &C,
        id: i64,
        status: TaskStatus,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id, TaskScope::Active)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated, Vec::new()))
    }

    /// Marks an active task deleted. Tag links are kept.
    pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        Self::set_deleted_at(db, id, TaskScope::Active, Some(Utc::now())).await
    }

    /// Clears the deletion marker of a trashed task.
    pub async fn restore<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        Self::set_deleted_at(db, id, TaskScope::Trashed, None).await
    }

    async fn set_deleted_at<C: ConnectionTrait>(
        db: &C,
        id: i64,
        scope: TaskScope,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<u64, DbErr> {
        let result = task::Entity::update_many()
            .col_expr(task::Column::DeletedAt, Expr::value(deleted_at))
            .col_expr(task::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(task::Column::Id.eq(id))
            .filter(scope.condition())
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
