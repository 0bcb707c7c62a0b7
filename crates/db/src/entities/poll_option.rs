//! Poll option entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One answer a voter can pick.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_option")]
pub struct Model {
    /// Option ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning poll
    #[sea_orm(indexed)]
    pub poll_id: String,

    /// Option text, unique per poll ignoring case
    pub text: String,

    /// Denormalized count of live ballots referencing this option
    pub votes: i32,

    /// Creation time; orders the options
    pub created_at: DateTimeWithTimeZone,

    /// Last change to text or tally
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,

    #[sea_orm(has_many = "super::individual_vote::Entity")]
    IndividualVote,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::individual_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IndividualVote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
