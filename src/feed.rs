use std::collections::{HashMap, HashSet};

use crate::api::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Replace,
    Append,
}

/// Client-side cache of the paginated post collection. Pages are requested by
/// number, concatenated on append, and deduplicated by identifier. Once any
/// page comes back shorter than the page size the feed is exhausted and stays
/// exhausted until the next replace.
#[derive(Debug, Clone)]
pub struct FeedState {
    posts: Vec<Post>,
    page_size: u32,
    next_page: u32,
    has_more: bool,
}

impl FeedState {
    pub fn new(page_size: u32) -> Self {
        Self {
            posts: Vec::new(),
            page_size: page_size.max(1),
            next_page: 1,
            has_more: true,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// The page number the next load should request.
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    pub fn author_ids(&self) -> HashSet<String> {
        self.posts
            .iter()
            .map(|post| post.user_id.clone())
            .collect()
    }

    /// Applies one fetched page. Returns the number of posts added to the
    /// cache. An append after exhaustion is a no-op; a replace starts a new
    /// pagination session from page 1.
    pub fn apply_page(&mut self, mut incoming: Vec<Post>, mode: LoadMode) -> usize {
        let short_page = (incoming.len() as u32) < self.page_size;
        match mode {
            LoadMode::Replace => {
                let mut seen: HashSet<String> = HashSet::new();
                incoming.retain(|post| seen.insert(post.id.clone()));
                let added = incoming.len();
                self.posts = incoming;
                self.next_page = 2;
                self.has_more = !short_page;
                added
            }
            LoadMode::Append => {
                if !self.has_more {
                    return 0;
                }
                let mut seen: HashSet<String> =
                    self.posts.iter().map(|post| post.id.clone()).collect();
                incoming.retain(|post| seen.insert(post.id.clone()));
                let added = incoming.len();
                self.posts.extend(incoming);
                self.next_page += 1;
                if short_page {
                    self.has_more = false;
                }
                added
            }
        }
    }
}

/// Pure re-derivation of the displayed feed: case-insensitive substring match
/// over description and author name, optional restriction to followed
/// authors, ordered newest first with identifier as tie-break. Touches only
/// the already-fetched cache.
pub fn visible_posts<'a>(
    posts: &'a [Post],
    authors: &HashMap<String, String>,
    search: &str,
    followed_only: bool,
    following: &HashSet<String>,
) -> Vec<&'a Post> {
    let needle = search.trim().to_lowercase();
    let mut matched: Vec<&Post> = posts
        .iter()
        .filter(|post| {
            if followed_only && !following.contains(&post.user_id) {
                return false;
            }
            if needle.is_empty() {
                return true;
            }
            if post.description.to_lowercase().contains(&needle) {
                return true;
            }
            authors
                .get(&post.user_id)
                .map(|name| name.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .collect();
    matched.sort_by(|a, b| a.display_key().cmp(&b.display_key()));
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::api::Media;

    fn post(id: &str, user: &str, description: &str, minute: u32) -> Post {
        Post {
            id: id.to_string(),
            user_id: user.to_string(),
            description: description.to_string(),
            media: Media::None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn full_page_keeps_feed_open() {
        let mut feed = FeedState::new(3);
        let added = feed.apply_page(
            vec![post("5", "u", "", 50), post("4", "u", "", 40), post("3", "u", "", 30)],
            LoadMode::Replace,
        );
        assert_eq!(added, 3);
        assert!(feed.has_more());
        assert_eq!(feed.next_page(), 2);
    }

    #[test]
    fn short_page_exhausts_feed_and_latches() {
        let mut feed = FeedState::new(3);
        feed.apply_page(
            vec![post("5", "u", "", 50), post("4", "u", "", 40), post("3", "u", "", 30)],
            LoadMode::Replace,
        );
        feed.apply_page(
            vec![post("2", "u", "", 20), post("1", "u", "", 10)],
            LoadMode::Append,
        );
        assert!(!feed.has_more());
        assert_eq!(feed.len(), 5);

        // Further appends leave the cache untouched.
        let added = feed.apply_page(vec![post("0", "u", "", 5)], LoadMode::Append);
        assert_eq!(added, 0);
        assert_eq!(feed.len(), 5);
        assert!(!feed.has_more());
    }

    #[test]
    fn page_scenario_three_then_two() {
        let mut feed = FeedState::new(3);
        feed.apply_page(
            vec![post("5", "u", "", 50), post("4", "u", "", 40), post("3", "u", "", 30)],
            LoadMode::Replace,
        );
        let ids: Vec<&str> = feed.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["5", "4", "3"]);
        assert!(feed.has_more());

        feed.apply_page(
            vec![post("2", "u", "", 20), post("1", "u", "", 10)],
            LoadMode::Append,
        );
        let ids: Vec<&str> = feed.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["5", "4", "3", "2", "1"]);
        assert!(!feed.has_more());
    }

    #[test]
    fn append_dedups_repeated_identifiers() {
        let mut feed = FeedState::new(2);
        feed.apply_page(vec![post("a", "u", "", 50), post("b", "u", "", 40)], LoadMode::Replace);
        let added = feed.apply_page(
            vec![post("b", "u", "", 40), post("c", "u", "", 30)],
            LoadMode::Append,
        );
        assert_eq!(added, 1);
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn replace_resets_pagination_session() {
        let mut feed = FeedState::new(3);
        feed.apply_page(vec![post("a", "u", "", 50)], LoadMode::Replace);
        assert!(!feed.has_more());

        feed.apply_page(
            vec![post("x", "u", "", 50), post("y", "u", "", 40), post("z", "u", "", 30)],
            LoadMode::Replace,
        );
        assert!(feed.has_more());
        assert_eq!(feed.next_page(), 2);
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn visible_is_pure_and_deterministic() {
        let posts = vec![
            post("a", "u1", "Learning Rust ownership", 10),
            post("b", "u2", "Gardening tips", 20),
        ];
        let mut authors = HashMap::new();
        authors.insert("u1".to_string(), "Ada".to_string());
        authors.insert("u2".to_string(), "Grace".to_string());
        let following = HashSet::new();

        let first = visible_posts(&posts, &authors, "rust", false, &following);
        let second = visible_posts(&posts, &authors, "rust", false, &following);
        let first_ids: Vec<&str> = first.iter().map(|p| p.id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_ids, ["a"]);
    }

    #[test]
    fn search_matches_author_name_case_insensitively() {
        let posts = vec![post("a", "u1", "plain text", 10)];
        let mut authors = HashMap::new();
        authors.insert("u1".to_string(), "Ada Lovelace".to_string());
        let following = HashSet::new();

        let hits = visible_posts(&posts, &authors, "LOVELACE", false, &following);
        assert_eq!(hits.len(), 1);
        let misses = visible_posts(&posts, &authors, "turing", false, &following);
        assert!(misses.is_empty());
    }

    #[test]
    fn followed_only_restricts_to_following_set() {
        let posts = vec![post("a", "u1", "", 10), post("b", "u2", "", 20)];
        let authors = HashMap::new();
        let mut following = HashSet::new();
        following.insert("u2".to_string());

        let hits = visible_posts(&posts, &authors, "", true, &following);
        let ids: Vec<&str> = hits.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["b"]);
    }

    #[test]
    fn display_order_is_created_desc_then_id_asc() {
        let posts = vec![
            post("c", "u", "", 10),
            post("b", "u", "", 30),
            post("a", "u", "", 30),
        ];
        let authors = HashMap::new();
        let following = HashSet::new();

        let ordered = visible_posts(&posts, &authors, "", false, &following);
        let ids: Vec<&str> = ordered.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
