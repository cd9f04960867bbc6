use sea_orm_migration::prelude::*;

mod m20250807000000_create_tasks;
mod m20250807000100_create_tags;
mod m20250807000200_create_task_tag;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250807000000_create_tasks::Migration),
            Box::new(m20250807000100_create_tags::Migration),
            Box::new(m20250807000200_create_task_tag::Migration),
        ]
    }
}
