use sea_orm::entity::prelude::*;

/// One row per tracked job. Nested records are stored as JSON text so the
/// schema stays append-only as their shape grows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // uuid text
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub original_text: String,
    #[sea_orm(column_type = "Text")]
    pub scraped_meta: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub parsed_result: Option<String>,
    pub created_at: DateTimeUtc,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_msg: Option<String>,
    pub remote_task_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
