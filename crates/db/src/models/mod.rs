pub mod tag;
pub mod task;
pub mod task_tag;
