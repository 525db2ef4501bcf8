use sea_orm::*;
use sea_query::{Index, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{role, role_permission, round_assignment, submission, submission_group, vote};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "organizer", "member"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "competition:create"),
    ("admin", "competition:manage"),
    ("admin", "competition:delete"),
    ("admin", "competition:force_status"),
    ("admin", "user:manage"),
    // Organizer: runs competitions but cannot force statuses or delete
    ("organizer", "competition:create"),
    ("organizer", "competition:manage"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Seed roles
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    // Seed role-permission mappings
    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes,
/// so we create them manually on startup. The unique ones back the
/// one-entry-per-user, one-group-row-per-submission, and
/// one-assignment-per-voter invariants against insert races.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        Index::create()
            .if_not_exists()
            .name("idx_submission_competition_user")
            .table(submission::Entity)
            .col(submission::Column::CompetitionId)
            .col(submission::Column::UserId)
            .unique()
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .name("idx_submission_group_competition_submission")
            .table(submission_group::Entity)
            .col(submission_group::Column::CompetitionId)
            .col(submission_group::Column::SubmissionId)
            .unique()
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .name("idx_round_assignment_competition_voter")
            .table(round_assignment::Entity)
            .col(round_assignment::Column::CompetitionId)
            .col(round_assignment::Column::VoterUserId)
            .unique()
            .to_string(PostgresQueryBuilder),
        // Tally scans: all votes for one competition and round
        Index::create()
            .if_not_exists()
            .name("idx_vote_competition_round")
            .table(vote::Entity)
            .col(vote::Column::CompetitionId)
            .col(vote::Column::Round)
            .to_string(PostgresQueryBuilder),
    ];

    for stmt in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to create index: {}", e);
            }
        }
    }

    info!("Ensured voting engine indexes exist");
    Ok(())
}
