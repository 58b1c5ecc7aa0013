use crate::users;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::Serialize;
use uuid::Uuid;

/// One impersonation session. `ended_at` stays empty while it is running.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "impersonations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub impersonator_id: Uuid,
    pub impersonated_id: Uuid,
    pub started_at: DateTimeWithTimeZone,
    pub ended_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "users::Entity",
        from = "Column::ImpersonatorId",
        to = "users::Column::Id",
        on_delete = "Cascade"
    )]
    Impersonator,
    #[sea_orm(
        belongs_to = "users::Entity",
        from = "Column::ImpersonatedId",
        to = "users::Column::Id",
        on_delete = "Cascade"
    )]
    Impersonated,
}

impl Related<users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Impersonator.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
