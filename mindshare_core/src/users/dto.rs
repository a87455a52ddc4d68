use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::region::Region;

/// Leaderboard entry, in the shape the front end posts and reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub discord_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    pub region: Region,
    #[serde(default)]
    pub mindshare_score: u64,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertUserResponse {
    pub success: bool,
    pub user: User,
}
