//! Display names and colors for the two user slots.

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use super::state::UserSlot;
use crate::remote::RemoteService;

/// Banner text shown while the directory is on its fallback.
pub const DIRECTORY_ERROR_BANNER: &str = "Could not obtain user names. Using default placeholders.";

const USER1_DEFAULT_NAME: &str = "User1";
const USER1_DEFAULT_COLOR: &str = "#3b82f6";
const USER2_DEFAULT_NAME: &str = "User2";
const USER2_DEFAULT_COLOR: &str = "#22c55e";

/// How a user slot is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,

    /// Opaque color token, passed through to the presentation layer.
    pub color: String,
}

impl UserInfo {
    fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// Resolved user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDirectory {
    pub user1: UserInfo,
    pub user2: UserInfo,

    /// The last load failed and the defaults are in use.
    pub error: bool,
}

impl UserDirectory {
    /// Default names with the error flag raised.
    pub fn fallback() -> Self {
        Self {
            error: true,
            ..Self::default()
        }
    }

    pub fn get(&self, slot: UserSlot) -> &UserInfo {
        match slot {
            UserSlot::User1 => &self.user1,
            UserSlot::User2 => &self.user2,
        }
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self {
            user1: UserInfo::new(USER1_DEFAULT_NAME, USER1_DEFAULT_COLOR),
            user2: UserInfo::new(USER2_DEFAULT_NAME, USER2_DEFAULT_COLOR),
            error: false,
        }
    }
}

/// Shape `/users/names` must have to be accepted. Extra fields are ignored.
#[derive(Deserialize)]
struct NamesPayload {
    user1: UserInfo,
    user2: UserInfo,
}

/// Validate a `/users/names` payload.
pub fn parse_names(payload: serde_json::Value) -> Result<UserDirectory, serde_json::Error> {
    let names: NamesPayload = serde_json::from_value(payload)?;
    Ok(UserDirectory {
        user1: names.user1,
        user2: names.user2,
        error: false,
    })
}

/// Fetch the user directory.
///
/// Never fails: any transport error, error status, or payload that does not
/// validate yields [`UserDirectory::fallback`].
pub async fn load_names(remote: &dyn RemoteService) -> UserDirectory {
    let payload = match remote.user_names().await {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to fetch user names, using defaults: {}", e);
            return UserDirectory::fallback();
        }
    };

    match parse_names(payload) {
        Ok(directory) => {
            info!(
                "Loaded user names: user1={}, user2={}",
                directory.user1.name, directory.user2.name
            );
            directory
        }
        Err(e) => {
            warn!("Malformed user names payload, using defaults: {}", e);
            UserDirectory::fallback()
        }
    }
}
