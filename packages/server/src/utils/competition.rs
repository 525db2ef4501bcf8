use sea_orm::DatabaseTransaction;
use sea_orm::sea_query::LockType;
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};

use crate::engine::status::CompetitionStatus;
use crate::entity::competition;
use crate::error::AppError;

/// Look up a competition by ID, returning 404 if not found.
pub async fn find_competition<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

/// Look up a competition with a `FOR UPDATE` row lock. Every engine operation
/// that mutates competition-owned rows goes through this, which serializes
/// concurrent advances, tallies, and group creation per competition.
pub async fn find_competition_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

/// Parse a competition's persisted status, treating corruption as internal.
pub fn parse_status(competition: &competition::Model) -> Result<CompetitionStatus, AppError> {
    CompetitionStatus::parse(&competition.status).ok_or_else(|| {
        AppError::Internal(format!(
            "Competition {} has unknown status '{}'",
            competition.id, competition.status
        ))
    })
}

/// Check that a competition is in the expected phase.
pub fn require_status(
    competition: &competition::Model,
    expected: CompetitionStatus,
) -> Result<(), AppError> {
    let current = parse_status(competition)?;
    if current != expected {
        return Err(AppError::InvalidState(format!(
            "Competition is '{}' but this operation requires '{}'",
            current, expected
        )));
    }
    Ok(())
}
