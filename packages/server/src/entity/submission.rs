use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A competitor's mix entry. One per (competition, user), enforced by a
/// unique index created in `seed::ensure_indexes`.
///
/// Entries are never deleted once voting has started; non-participating
/// voters are penalized by soft-disqualification of their own entry.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub competition_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,
    /// Opaque reference to the mix audio artifact, stored externally.
    pub audio_ref: Uuid,

    pub is_disqualified: bool,
    /// Round-1 total points, copied from the group tally.
    pub round1_score: Option<i32>,
    pub advanced_to_round2: bool,
    /// Round-2 total points, written by the final tally.
    pub final_score: Option<i32>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
