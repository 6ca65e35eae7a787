use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repository::RepositoryError;

/// One workspace member as known to the external user directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    pub huddle_url: Option<String>,
}

/// Read-only view of the workspace member directory.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn users(&self) -> Result<Vec<UserProfile>, RepositoryError>;
}

/// Looks up the profile whose user ID is embedded in `mention`
/// (`<@U123>` matches the profile with `user_id == "U123"`).
pub fn profile_for_mention<'a>(users: &'a [UserProfile], mention: &str) -> Option<&'a UserProfile> {
    let inner = mention.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>'))?;
    users.iter().find(|profile| profile.user_id == inner)
}
