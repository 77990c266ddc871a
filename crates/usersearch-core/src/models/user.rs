use serde::{Deserialize, Serialize};

/// A user as stored locally. Identity is `id`; everything else is
/// overwritten wholesale when the same id is upserted again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub display_name: String,
    pub user_name: String,
    pub avatar_url: String,
}

impl UserRecord {
    pub fn new(
        id: i64,
        display_name: impl Into<String>,
        user_name: impl Into<String>,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            user_name: user_name.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// Case-insensitive "starts with" against display name or user name.
    /// An empty prefix matches everything.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        let prefix = prefix.to_lowercase();
        self.display_name.to_lowercase().starts_with(&prefix)
            || self.user_name.to_lowercase().starts_with(&prefix)
    }

    /// Label used by the command line host, e.g. `Ann Smith (@ann)`.
    pub fn label(&self) -> String {
        if self.user_name.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} (@{})", self.display_name, self.user_name)
        }
    }
}

// Response from the search endpoint: `{ok, error, users: [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserListResponse {
    #[serde(default)]
    pub ok: bool,
    pub error: Option<String>,
    pub users: Option<Vec<RemoteUser>>,
}

impl UserListResponse {
    /// Absent `users` is an empty result, not a failure.
    pub fn into_users(self) -> Vec<RemoteUser> {
        self.users.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: Option<i64>,
    pub display_name: Option<String>,
    #[serde(rename = "username")]
    pub user_name: Option<String>,
    pub avatar_url: Option<String>,
}

// Absent or null fields default to zero / empty string
impl From<RemoteUser> for UserRecord {
    fn from(user: RemoteUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            display_name: user.display_name.unwrap_or_default(),
            user_name: user.user_name.unwrap_or_default(),
            avatar_url: user.avatar_url.unwrap_or_default(),
        }
    }
}
