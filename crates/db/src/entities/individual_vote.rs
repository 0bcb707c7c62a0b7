//! Individual ballot entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One voter token's selection of a single option.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "individual_vote")]
pub struct Model {
    /// Ballot ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Poll the ballot belongs to
    #[sea_orm(indexed)]
    pub poll_id: String,

    /// Selected option
    #[sea_orm(indexed)]
    pub option_id: String,

    /// Opaque token identifying the voter within this poll
    #[serde(skip_serializing)]
    pub voter_token: String,

    /// When the ballot was cast
    pub created_at: DateTimeWithTimeZone,
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

    #[sea_orm(
        belongs_to = "super::poll_option::Entity",
        from = "Column::OptionId",
        to = "super::poll_option::Column::Id",
        on_delete = "Cascade"
    )]
    PollOption,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
