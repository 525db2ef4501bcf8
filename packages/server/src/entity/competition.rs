use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String, // in Markdown
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    /// One of:
    /// upcoming, open_for_submissions, voting_round1_setup, voting_round1_open,
    /// voting_round1_tallying, voting_round2_setup, voting_round2_open,
    /// voting_round2_tallying, completed, requires_manual_winner_selection, archived
    pub status: String,

    pub organizer_id: i32,
    #[sea_orm(belongs_to, from = "organizer_id", to = "id")]
    pub organizer: HasOne<super::user::Entity>,

    /// Set by the Round-2 tally, or manually after a true tie.
    pub winner_submission_id: Option<i32>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
