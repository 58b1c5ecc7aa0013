use chrono::Utc;
use entity::users;
use platform_authz::{Scope, UserRecord};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult, Page};

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub system_admin: bool,
    pub password_hash: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Narrow a user query to the rows a [`Scope`] allows.
pub trait ScopeExt {
    fn scoped(self, scope: Scope) -> Self;
}

impl ScopeExt for Select<users::Entity> {
    fn scoped(self, scope: Scope) -> Self {
        match scope {
            Scope::All => self,
            Scope::Only(id) => self.filter(users::Column::Id.eq(id)),
        }
    }
}

pub fn user_record(model: &users::Model) -> UserRecord {
    UserRecord::new(model.id, model.system_admin)
}

pub async fn list_users(pool: &DbPool, scope: Scope, page: Page) -> DbResult<Vec<users::Model>> {
    let rows = users::Entity::find()
        .scoped(scope)
        .order_by_asc(users::Column::Email)
        .limit(page.limit)
        .offset(page.offset)
        .all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_user(pool: &DbPool, id: Uuid) -> DbResult<Option<users::Model>> {
    Ok(users::Entity::find_by_id(id).one(pool).await?)
}

pub async fn find_user_by_email(pool: &DbPool, email: &str) -> DbResult<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(pool)
        .await?)
}

pub async fn user_count(pool: &DbPool) -> DbResult<u64> {
    Ok(users::Entity::find().count(pool).await?)
}

pub async fn insert_user(pool: &DbPool, user: NewUser) -> DbResult<users::Model> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(user.email),
        display_name: Set(user.display_name),
        system_admin: Set(user.system_admin),
        password_hash: Set(user.password_hash),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(pool)
    .await
    .map_err(|err| DbError::on_write(err, "email"))
}

pub async fn update_user(pool: &DbPool, id: Uuid, changes: UserChanges) -> DbResult<users::Model> {
    let mut active: users::ActiveModel = load(pool, id).await?.into();
    if let Some(email) = changes.email {
        active.email = Set(email);
    }
    if let Some(display_name) = changes.display_name {
        active.display_name = Set(display_name);
    }
    active.updated_at = Set(Utc::now().into());
    active
        .update(pool)
        .await
        .map_err(|err| DbError::on_write(err, "email"))
}

pub async fn set_system_admin(pool: &DbPool, id: Uuid, system_admin: bool) -> DbResult<users::Model> {
    let mut active: users::ActiveModel = load(pool, id).await?.into();
    active.system_admin = Set(system_admin);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(pool).await?)
}

/// Returns `false` when no row matched.
pub async fn delete_user(pool: &DbPool, id: Uuid) -> DbResult<bool> {
    let result = users::Entity::delete_by_id(id).exec(pool).await?;
    Ok(result.rows_affected > 0)
}

async fn load(pool: &DbPool, id: Uuid) -> DbResult<users::Model> {
    find_user(pool, id)
        .await?
        .ok_or(DbError::NotFound { entity: "user", id })
}
