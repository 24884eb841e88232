//! Role types for narrative participants.

use serde::{Deserialize, Serialize};

/// Who authored a piece of text.
///
/// Generated descriptions are [`Role::Assistant`], the dreamer's actions are
/// [`Role::User`]. [`Role::System`] only appears in generator requests.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}
