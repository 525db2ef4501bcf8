use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Round-1 judging duty: which group a voter must rate.
///
/// `assigned_group_number` differs from `voter_group_number` whenever the
/// competition has at least two groups.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "round_assignment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub competition_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,

    pub voter_user_id: i32,
    #[sea_orm(belongs_to, from = "voter_user_id", to = "id")]
    pub voter: HasOne<super::user::Entity>,

    /// The group containing the voter's own entry.
    pub voter_group_number: i32,
    /// The group the voter must judge.
    pub assigned_group_number: i32,

    pub has_voted: bool,
    pub voting_completed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
