//! Poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a voter token is honored when a ballot is cast.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum VotingSecurityLevel {
    /// Every ballot is a first-time ballot; revisions are not tracked.
    #[sea_orm(string_value = "none")]
    None,
    /// Voter token kept in a plain cookie.
    #[default]
    #[sea_orm(string_value = "cookie_basic")]
    CookieBasic,
    /// Voter token kept in a hardened cookie.
    #[sea_orm(string_value = "cookie_strict")]
    CookieStrict,
    /// Voter token derived from the client address.
    #[sea_orm(string_value = "ip_address")]
    IpAddress,
}

/// A question with its voting rules.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    /// Poll ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Question put to voters
    #[sea_orm(column_type = "Text")]
    pub question: String,

    /// Display name of the creator
    #[sea_orm(nullable)]
    pub creator_display_name: Option<String>,

    /// Whether one ballot may select several options
    pub allow_multiple_selections: bool,

    /// How voter tokens are honored
    pub voting_security_level: VotingSecurityLevel,

    /// Whether the poll shows up in public listings
    pub is_public: bool,

    /// Bearer secret granting edit and delete rights
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub modification_code: String,

    /// Creation time
    pub created_at: DateTimeWithTimeZone,

    /// Last effective change
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_option::Entity")]
    PollOption,

    #[sea_orm(has_many = "super::individual_vote::Entity")]
    IndividualVote,

    #[sea_orm(has_many = "super::poll_edit_history::Entity")]
    PollEditHistory,
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl Related<super::individual_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IndividualVote.def()
    }
}

impl Related<super::poll_edit_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollEditHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
