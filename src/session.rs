use std::collections::HashSet;

use parking_lot::RwLock;

use crate::api::User;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no viewer configured: set api.user_id in the config file or SKILLHUB_API__USER_ID")]
    MissingViewer,
}

/// Viewer identity for this run. Constructed once at startup and passed into
/// the model explicitly; nothing reads the viewer from ambient state. The
/// following set is fetched once per session and shared with the filter.
pub struct Session {
    viewer: User,
    following: RwLock<Option<HashSet<String>>>,
}

impl Session {
    pub fn new(viewer: User) -> Self {
        Self {
            viewer,
            following: RwLock::new(None),
        }
    }

    pub fn viewer(&self) -> &User {
        &self.viewer
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer.id
    }

    /// Cosmetic ownership check for hiding edit/delete controls. The server
    /// independently re-validates authorization; this gates nothing real.
    pub fn owns(&self, author_id: &str) -> bool {
        self.viewer.id == author_id
    }

    pub fn set_following(&self, ids: HashSet<String>) {
        *self.following.write() = Some(ids);
    }

    pub fn following_loaded(&self) -> bool {
        self.following.read().is_some()
    }

    pub fn following(&self) -> HashSet<String> {
        self.following.read().clone().unwrap_or_default()
    }

    pub fn follows(&self, user_id: &str) -> bool {
        self.following
            .read()
            .as_ref()
            .map(|ids| ids.contains(user_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> User {
        User {
            id: "u1".into(),
            username: "viewer".into(),
            display_name: String::new(),
        }
    }

    #[test]
    fn ownership_matches_viewer_id() {
        let session = Session::new(viewer());
        assert!(session.owns("u1"));
        assert!(!session.owns("u2"));
    }

    #[test]
    fn following_defaults_to_empty_until_fetched() {
        let session = Session::new(viewer());
        assert!(!session.following_loaded());
        assert!(!session.follows("u2"));

        let mut ids = HashSet::new();
        ids.insert("u2".to_string());
        session.set_following(ids);
        assert!(session.following_loaded());
        assert!(session.follows("u2"));
        assert!(!session.follows("u3"));
    }
}
