use crate::api::{Comment, Reply};
use crate::interact::LikeState;

/// One comment in a post's thread with its viewer-local like state and its
/// replies (one level deep, never nested further).
#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: Comment,
    pub like: LikeState,
    pub replies: Vec<Reply>,
}

impl CommentEntry {
    pub fn new(comment: Comment) -> Self {
        Self {
            comment,
            like: LikeState::default(),
            replies: Vec::new(),
        }
    }
}

/// Lazy comment thread for one post. Nothing is fetched until the viewer
/// expands the panel, and the thread is fetched at most once across repeated
/// expand/collapse toggles until a mutation invalidates it.
#[derive(Debug, Clone, Default)]
pub struct ThreadState {
    expanded: bool,
    loaded: bool,
    entries: Vec<CommentEntry>,
}

impl ThreadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    pub fn entries(&self) -> &[CommentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, comment_id: &str) -> Option<&CommentEntry> {
        self.entries
            .iter()
            .find(|entry| entry.comment.id == comment_id)
    }

    pub fn entry_mut(&mut self, comment_id: &str) -> Option<&mut CommentEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.comment.id == comment_id)
    }

    /// Flips the panel open or closed. Returns true when the caller must
    /// issue the one-time thread fetch (first expansion, or first expansion
    /// after an invalidation).
    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded && !self.loaded
    }

    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    pub fn apply_loaded(&mut self, entries: Vec<CommentEntry>) {
        self.entries = entries;
        self.loaded = true;
    }

    /// Drops the cached thread so the next expansion refetches it.
    pub fn invalidate(&mut self) {
        self.loaded = false;
        self.entries.clear();
    }

    /// Appends a server-returned comment at the end; the thread stays
    /// chronological, newest last.
    pub fn append(&mut self, comment: Comment) {
        self.entries.push(CommentEntry::new(comment));
    }

    pub fn apply_edit(&mut self, comment_id: &str, text: &str) -> bool {
        match self.entry_mut(comment_id) {
            Some(entry) => {
                entry.comment.content = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, comment_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.comment.id != comment_id);
        self.entries.len() != before
    }

    pub fn append_reply(&mut self, comment_id: &str, reply: Reply) -> bool {
        match self.entry_mut(comment_id) {
            Some(entry) => {
                entry.replies.push(reply);
                true
            }
            None => false,
        }
    }

    pub fn apply_reply_edit(&mut self, reply_id: &str, text: &str) -> bool {
        for entry in &mut self.entries {
            if let Some(reply) = entry.replies.iter_mut().find(|reply| reply.id == reply_id) {
                reply.content = text.to_string();
                return true;
            }
        }
        false
    }

    pub fn remove_reply(&mut self, reply_id: &str) -> bool {
        for entry in &mut self.entries {
            let before = entry.replies.len();
            entry.replies.retain(|reply| reply.id != reply_id);
            if entry.replies.len() != before {
                return true;
            }
        }
        false
    }
}

/// Composer validation: whitespace-only input is a no-op and never reaches
/// the network.
pub fn prepare_comment_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn comment(id: &str, minute: u32) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: "p1".into(),
            user_id: "u1".into(),
            content: format!("comment {id}"),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
        }
    }

    fn reply(id: &str, comment_id: &str) -> Reply {
        Reply {
            id: id.to_string(),
            comment_id: comment_id.to_string(),
            user_id: "u2".into(),
            content: format!("reply {id}"),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 13, 0, 0).unwrap(),
        }
    }

    #[test]
    fn fetch_requested_only_on_first_expansion() {
        let mut thread = ThreadState::new();
        assert!(thread.toggle_expanded(), "first expansion fetches");
        thread.apply_loaded(vec![CommentEntry::new(comment("c1", 1))]);

        assert!(!thread.toggle_expanded(), "collapse never fetches");
        assert!(!thread.toggle_expanded(), "re-expansion reuses the cache");
        assert!(!thread.toggle_expanded());
        assert!(!thread.toggle_expanded());
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn collapse_before_load_still_fetches_once_loaded_flag_set() {
        let mut thread = ThreadState::new();
        assert!(thread.toggle_expanded());
        assert!(!thread.has_loaded());
        // Panel closed again before the response arrived; the response still
        // marks the thread loaded.
        thread.collapse();
        thread.apply_loaded(Vec::new());
        assert!(thread.has_loaded());
        assert!(!thread.toggle_expanded());
    }

    #[test]
    fn invalidation_rearms_the_fetch() {
        let mut thread = ThreadState::new();
        thread.toggle_expanded();
        thread.apply_loaded(vec![CommentEntry::new(comment("c1", 1))]);
        thread.invalidate();
        thread.collapse();
        assert!(thread.toggle_expanded());
    }

    #[test]
    fn append_keeps_chronological_order() {
        let mut thread = ThreadState::new();
        thread.apply_loaded(vec![
            CommentEntry::new(comment("c1", 1)),
            CommentEntry::new(comment("c2", 2)),
        ]);
        thread.append(comment("c3", 3));
        let ids: Vec<&str> = thread
            .entries()
            .iter()
            .map(|entry| entry.comment.id.as_str())
            .collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
    }

    #[test]
    fn edit_and_remove_by_id() {
        let mut thread = ThreadState::new();
        thread.apply_loaded(vec![
            CommentEntry::new(comment("c1", 1)),
            CommentEntry::new(comment("c2", 2)),
        ]);
        assert!(thread.apply_edit("c1", "updated"));
        assert_eq!(thread.entry("c1").unwrap().comment.content, "updated");
        assert!(!thread.apply_edit("missing", "nope"));

        assert!(thread.remove("c2"));
        assert!(!thread.remove("c2"));
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn replies_scoped_to_parent_comment() {
        let mut thread = ThreadState::new();
        thread.apply_loaded(vec![
            CommentEntry::new(comment("c1", 1)),
            CommentEntry::new(comment("c2", 2)),
        ]);
        assert!(thread.append_reply("c2", reply("r1", "c2")));
        assert!(!thread.append_reply("missing", reply("r2", "missing")));
        assert_eq!(thread.entry("c1").unwrap().replies.len(), 0);
        assert_eq!(thread.entry("c2").unwrap().replies.len(), 1);

        assert!(thread.apply_reply_edit("r1", "edited"));
        assert_eq!(thread.entry("c2").unwrap().replies[0].content, "edited");

        assert!(thread.remove_reply("r1"));
        assert!(!thread.remove_reply("r1"));
    }

    #[test]
    fn empty_composer_text_is_rejected() {
        assert_eq!(prepare_comment_text(""), None);
        assert_eq!(prepare_comment_text("   \n\t "), None);
        assert_eq!(prepare_comment_text("  hi  "), Some("hi".to_string()));
    }
}
