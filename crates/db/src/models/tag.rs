use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::entities::tag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    pub(crate) fn from_model(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }

    /// Exact, case-sensitive name lookup.
    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = tag::Entity::find()
            .filter(tag::Column::Name.eq(name))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Inserts `name` unless it exists, then reads it back. A concurrent
    /// insert of the same name is absorbed by the conflict clause.
    pub async fn find_or_create<C: ConnectionTrait>(db: &C, name: &str) -> Result<Self, DbErr> {
        if let Some(existing) = Self::find_by_name(db, name).await? {
            return Ok(existing);
        }

        let active = tag::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };
        let inserted = tag::Entity::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(tag::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let tag = Self::find_by_name(db, name)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Tag '{name}' not found")))?;
        if inserted > 0 {
            tracing::debug!(tag_id = tag.id, name, "Created tag");
        }
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, PaginatorTrait, QueryOrder, TransactionTrait};
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn find_or_create_reuses_exact_name() {
        let db = setup_db().await;

        let first = Tag::find_or_create(&db, "backend").await.unwrap();
        let again = Tag::find_or_create(&db, "backend").await.unwrap();
        let other_case = Tag::find_or_create(&db, "Backend").await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first.id, other_case.id);

        let names: Vec<_> = tag::Entity::find()
            .order_by_asc(tag::Column::Name)
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Backend", "backend"]);
    }

    #[tokio::test]
    async fn existing_name_inside_transaction_is_reused_without_error() {
        let db = setup_db().await;
        let committed = Tag::find_or_create(&db, "shared").await.unwrap();

        let tx = db.begin().await.unwrap();
        // Bypass the lookup to hit the unique index the way a racing writer would.
        let raced = tag::Entity::insert(tag::ActiveModel {
            name: Set("shared".to_string()),
            ..Default::default()
        })
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(tag::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&tx)
        .await
        .unwrap();
        assert_eq!(raced, 0);

        let reused = Tag::find_or_create(&tx, "shared").await.unwrap();
        let fresh = Tag::find_or_create(&tx, "fresh").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(reused, committed);
        assert_eq!(Tag::find_by_name(&db, "fresh").await.unwrap(), Some(fresh));
        assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 2);
    }
}
