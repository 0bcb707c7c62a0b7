//! Poll edit history entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Record of one effective change to a poll.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_edit_history")]
pub struct Model {
    /// Serial ID; breaks ties between rows of one update
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Edited poll
    #[sea_orm(indexed)]
    pub poll_id: String,

    /// When the update was applied
    pub edited_at: DateTimeWithTimeZone,

    /// Changed aspect, e.g. `question` or `option_removed`
    pub field_changed: String,

    /// Affected option; cleared when that option is deleted
    #[sea_orm(nullable)]
    pub option_id_changed: Option<String>,

    /// Value before the change
    #[sea_orm(column_type = "Text", nullable)]
    pub old_value: Option<String>,

    /// Value after the change
    #[sea_orm(column_type = "Text", nullable)]
    pub new_value: Option<String>,

    /// Human-readable summary
    #[sea_orm(column_type = "Text", nullable)]
    pub change_description: Option<String>,
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
        from = "Column::OptionIdChanged",
        to = "super::poll_option::Column::Id",
        on_delete = "SetNull"
    )]
    PollOption,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
