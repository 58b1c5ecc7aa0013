use chrono::Utc;
use entity::impersonations;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder, QuerySelect};
use tracing::info;
use uuid::Uuid;

use crate::{DbPool, DbResult, Page};

pub async fn record_impersonation_start(
    pool: &DbPool,
    impersonator_id: Uuid,
    impersonated_id: Uuid,
) -> DbResult<impersonations::Model> {
    let row = impersonations::ActiveModel {
        id: Set(Uuid::new_v4()),
        impersonator_id: Set(impersonator_id),
        impersonated_id: Set(impersonated_id),
        started_at: Set(Utc::now().into()),
        ended_at: Set(None),
    }
    .insert(pool)
    .await?;
    info!(%impersonator_id, %impersonated_id, log_id = %row.id, "impersonation started");
    Ok(row)
}

pub async fn find_impersonation(
    pool: &DbPool,
    id: Uuid,
) -> DbResult<Option<impersonations::Model>> {
    Ok(impersonations::Entity::find_by_id(id).one(pool).await?)
}

/// Close the audit row `id`. Returns `None` when it is missing or already
/// closed, so stopping twice is not an error.
pub async fn record_impersonation_stop(
    pool: &DbPool,
    id: Uuid,
) -> DbResult<Option<impersonations::Model>> {
    let Some(open) = find_impersonation(pool, id)
        .await?
        .filter(|row| row.ended_at.is_none())
    else {
        return Ok(None);
    };
    let mut active: impersonations::ActiveModel = open.into();
    active.ended_at = Set(Some(Utc::now().into()));
    let row = active.update(pool).await?;
    info!(
        impersonator_id = %row.impersonator_id,
        impersonated_id = %row.impersonated_id,
        log_id = %row.id,
        "impersonation stopped"
    );
    Ok(Some(row))
}

pub async fn list_impersonations(
    pool: &DbPool,
    page: Page,
) -> DbResult<Vec<impersonations::Model>> {
    Ok(impersonations::Entity::find()
        .order_by_desc(impersonations::Column::StartedAt)
        .limit(page.limit)
        .offset(page.offset)
        .all(pool)
        .await?)
}
