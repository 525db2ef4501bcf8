use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Round-1 partition membership for a submission, plus the cached group
/// tally. The vote counters and `total_points` are derived from raw `vote`
/// rows at tally time, never incremented on the voting path.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub competition_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,

    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    /// 1-based group number within the competition.
    pub group_number: i32,

    pub first_place_votes: i32,
    pub second_place_votes: i32,
    pub third_place_votes: i32,
    pub total_points: i32,
    /// 1-based rank within the group; `NULL` until tallied, and for
    /// disqualified entries.
    pub rank_in_group: Option<i32>,
}

impl ActiveModelBehavior for ActiveModel {}
