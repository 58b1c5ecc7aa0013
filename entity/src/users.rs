use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::Serialize;
use uuid::Uuid;

use crate::impersonations;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: String,
    pub system_admin: bool,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Impersonations,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Impersonations => Entity::has_many(impersonations::Entity).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
