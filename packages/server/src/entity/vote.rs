use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single ranked vote. A complete vote set is three rows for one voter in
/// one round: 3 points (1st), 2 points (2nd), 1 point (3rd), over distinct
/// submissions. These rows are the source of truth for every tally.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub competition_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,

    pub voter_user_id: i32,

    /// Voting round: 1 (group stage) or 2 (final).
    pub round: i32,

    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    /// 3, 2, or 1.
    pub points: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
