use chrono::Utc;
use entity::configurations;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use uuid::Uuid;

use crate::{DbError, DbPool, DbResult};

#[derive(Clone, Debug)]
pub struct NewConfiguration {
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigurationChanges {
    pub key: Option<String>,
    pub value: Option<String>,
    pub enabled: Option<bool>,
}

pub async fn list_configurations(pool: &DbPool) -> DbResult<Vec<configurations::Model>> {
    Ok(configurations::Entity::find()
        .order_by_asc(configurations::Column::Key)
        .all(pool)
        .await?)
}

pub async fn find_configuration(
    pool: &DbPool,
    id: Uuid,
) -> DbResult<Option<configurations::Model>> {
    Ok(configurations::Entity::find_by_id(id).one(pool).await?)
}

pub async fn insert_configuration(
    pool: &DbPool,
    input: NewConfiguration,
) -> DbResult<configurations::Model> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    configurations::ActiveModel {
        id: Set(Uuid::new_v4()),
        key: Set(input.key),
        value: Set(input.value),
        enabled: Set(input.enabled),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(pool)
    .await
    .map_err(|err| DbError::on_write(err, "configuration key"))
}

pub async fn update_configuration(
    pool: &DbPool,
    id: Uuid,
    changes: ConfigurationChanges,
) -> DbResult<configurations::Model> {
    let mut active: configurations::ActiveModel = load(pool, id).await?.into();
    if let Some(key) = changes.key {
        active.key = Set(key);
    }
    if let Some(value) = changes.value {
        active.value = Set(value);
    }
    if let Some(enabled) = changes.enabled {
        active.enabled = Set(enabled);
    }
    active.updated_at = Set(Utc::now().into());
    active
        .update(pool)
        .await
        .map_err(|err| DbError::on_write(err, "configuration key"))
}

/// Flip `enabled` and return the stored row.
pub async fn toggle_configuration(pool: &DbPool, id: Uuid) -> DbResult<configurations::Model> {
    let current = load(pool, id).await?;
    let enabled = !current.enabled;
    let mut active: configurations::ActiveModel = current.into();
    active.enabled = Set(enabled);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(pool).await?)
}

pub async fn delete_configuration(pool: &DbPool, id: Uuid) -> DbResult<()> {
    let result = configurations::Entity::delete_by_id(id).exec(pool).await?;
    if result.rows_affected == 0 {
        return Err(DbError::NotFound {
            entity: "configuration",
            id,
        });
    }
    Ok(())
}

async fn load(pool: &DbPool, id: Uuid) -> DbResult<configurations::Model> {
    find_configuration(pool, id).await?.ok_or(DbError::NotFound {
        entity: "configuration",
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn entry(key: &str) -> NewConfiguration {
        NewConfiguration {
            key: key.into(),
            value: "on".into(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn toggle_flips_enabled() {
        let pool = testing::pool().await;
        let row = insert_configuration(&pool, entry("signup.open")).await.unwrap();
        assert!(!toggle_configuration(&pool, row.id).await.unwrap().enabled);
        assert!(toggle_configuration(&pool, row.id).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn keys_are_unique_and_sorted() {
        let pool = testing::pool().await;
        insert_configuration(&pool, entry("b.key")).await.unwrap();
        insert_configuration(&pool, entry("a.key")).await.unwrap();
        let err = insert_configuration(&pool, entry("a.key")).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let keys: Vec<_> = list_configurations(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.key)
            .collect();
        assert_eq!(keys, vec!["a.key", "b.key"]);
    }

    #[tokio::test]
    async fn update_and_delete_missing_rows() {
        let pool = testing::pool().await;
        let row = insert_configuration(&pool, entry("mail.from")).await.unwrap();
        let updated = update_configuration(
            &pool,
            row.id,
            ConfigurationChanges {
                value: Some("ops@console.test".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.value, "ops@console.test");
        assert!(updated.enabled);

        delete_configuration(&pool, row.id).await.unwrap();
        let err = delete_configuration(&pool, row.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "configuration", .. }));
    }
}
