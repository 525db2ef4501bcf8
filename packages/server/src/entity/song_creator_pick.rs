use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Advisory ranked pick recorded by the competition organizer for Round 2.
/// Never feeds the automatic tally.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "song_creator_pick")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub competition_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,

    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    /// 1, 2, or 3.
    pub rank: i32,
    pub comment: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
