use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::tag::Tag;
use crate::entities::{tag, task_tag};

pub struct TaskTag;

impl TaskTag {
    /// Replaces the full tag set of a task with `names`.
    ///
    /// Names are trimmed and blanks skipped; a name that resolves to a tag
    /// already linked in this call is not linked twice. Returns the linked
    /// tags in supplied order.
    pub async fn replace_for_task<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
        names: &[String],
    ) -> Result<Vec<Tag>, DbErr> {
        task_tag::Entity::delete_many()
            .filter(task_tag::Column::TaskId.eq(task_id))
            .exec(db)
            .await?;

        let mut seen = HashSet::new();
        let mut linked = Vec::new();
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let tag = Tag::find_or_create(db, name).await?;
            if seen.insert(tag.id) {
                linked.push(tag);
            }
        }

        if !linked.is_empty() {
            let now = Utc::now();
            let rows = linked
                .iter()
                .enumerate()
                .map(|(position, tag)| task_tag::ActiveModel {
                    task_id: Set(task_id),
                    tag_id: Set(tag.id),
                    position: Set(position as i32),
                    created_at: Set(now),
                });
            task_tag::Entity::insert_many(rows).exec(db).await?;
        }

        tracing::debug!(task_id, count = linked.len(), "Replaced task tags");
        Ok(linked)
    }

    /// Tags of each task in `task_ids`, in link order.
    pub async fn tags_for_tasks<C: ConnectionTrait>(
        db: &C,
        task_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Tag>>, DbErr> {
        let mut by_task: HashMap<i64, Vec<Tag>> = HashMap::new();
        if task_ids.is_empty() {
            return Ok(by_task);
        }

        let rows = task_tag::Entity::find()
            .filter(task_tag::Column::TaskId.is_in(task_ids.iter().copied()))
            .order_by_asc(task_tag::Column::TaskId)
            .order_by_asc(task_tag::Column::Position)
            .order_by_asc(task_tag::Column::TagId)
            .find_also_related(tag::Entity)
            .all(db)
            .await?;

        for (link, tag) in rows {
            if let Some(tag) = tag {
                by_task
                    .entry(link.task_id)
                    .or_default()
                    .push(Tag::from_model(tag));
            }
        }
        Ok(by_task)
    }
}
