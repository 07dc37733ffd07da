use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use rand::seq::SliceRandom;

use crate::api::{self, Comment, Media, NotificationRequest, Post, Reply, User};

pub trait FeedService: Send + Sync {
    fn load_page(&self, page: u32, limit: u32) -> Result<Vec<Post>>;
    fn delete_post(&self, post_id: &str) -> Result<()>;
}

pub trait ProfileService: Send + Sync {
    fn lookup_user(&self, user_id: &str) -> Result<User>;
    fn following(&self, user_id: &str) -> Result<Vec<User>>;
}

pub trait InteractionService: Send + Sync {
    fn toggle_post_like(&self, post_id: &str, user_id: &str) -> Result<()>;
    fn post_like_status(&self, post_id: &str, user_id: &str) -> Result<bool>;
    fn post_like_count(&self, post_id: &str) -> Result<i64>;
    fn toggle_comment_like(&self, comment_id: &str, user_id: &str) -> Result<()>;
    fn comment_like_status(&self, comment_id: &str, user_id: &str) -> Result<bool>;
    fn comment_like_count(&self, comment_id: &str) -> Result<i64>;
}

pub trait CommentService: Send + Sync {
    fn load_comments(&self, post_id: &str) -> Result<Vec<Comment>>;
    fn create_comment(&self, post_id: &str, user_id: &str, text: &str) -> Result<Comment>;
    fn edit_comment(&self, comment_id: &str, text: &str) -> Result<()>;
    fn delete_comment(&self, comment_id: &str) -> Result<()>;
    fn load_replies(&self, comment_id: &str) -> Result<Vec<Reply>>;
    fn create_reply(&self, comment_id: &str, user_id: &str, text: &str) -> Result<Reply>;
    fn edit_reply(&self, reply_id: &str, text: &str) -> Result<()>;
    fn delete_reply(&self, reply_id: &str) -> Result<()>;
}

pub trait NotificationService: Send + Sync {
    fn notify(&self, request: &NotificationRequest) -> Result<()>;
    fn unread_count(&self, user_id: &str) -> Result<i64>;
}

pub struct RestFeedService {
    client: Arc<api::Client>,
}

impl RestFeedService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for RestFeedService {
    fn load_page(&self, page: u32, limit: u32) -> Result<Vec<Post>> {
        self.client
            .posts_page(page, limit)
            .context("fetch feed page")
    }

    fn delete_post(&self, post_id: &str) -> Result<()> {
        self.client.delete_post(post_id).context("delete post")
    }
}

pub struct RestProfileService {
    client: Arc<api::Client>,
}

impl RestProfileService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ProfileService for RestProfileService {
    fn lookup_user(&self, user_id: &str) -> Result<User> {
        self.client.user(user_id).context("fetch user profile")
    }

    fn following(&self, user_id: &str) -> Result<Vec<User>> {
        self.client.following(user_id).context("fetch following set")
    }
}

pub struct RestInteractionService {
    client: Arc<api::Client>,
}

impl RestInteractionService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl InteractionService for RestInteractionService {
    fn toggle_post_like(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.client.toggle_post_like(post_id, user_id)
    }

    fn post_like_status(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.client.post_like_status(post_id, user_id)
    }

    fn post_like_count(&self, post_id: &str) -> Result<i64> {
        self.client.post_like_count(post_id)
    }

    fn toggle_comment_like(&self, comment_id: &str, user_id: &str) -> Result<()> {
        self.client.toggle_comment_like(comment_id, user_id)
    }

    fn comment_like_status(&self, comment_id: &str, user_id: &str) -> Result<bool> {
        self.client.comment_like_status(comment_id, user_id)
    }

    fn comment_like_count(&self, comment_id: &str) -> Result<i64> {
        self.client.comment_like_count(comment_id)
    }
}

pub struct RestCommentService {
    client: Arc<api::Client>,
}

impl RestCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for RestCommentService {
    fn load_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.client
            .comments_for_post(post_id)
            .context("fetch comments")
    }

    fn create_comment(&self, post_id: &str, user_id: &str, text: &str) -> Result<Comment> {
        self.client.create_comment(post_id, user_id, text)
    }

    fn edit_comment(&self, comment_id: &str, text: &str) -> Result<()> {
        self.client.edit_comment(comment_id, text)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.client.delete_comment(comment_id)
    }

    fn load_replies(&self, comment_id: &str) -> Result<Vec<Reply>> {
        self.client
            .replies_for_comment(comment_id)
            .context("fetch replies")
    }

    fn create_reply(&self, comment_id: &str, user_id: &str, text: &str) -> Result<Reply> {
        self.client.create_reply(comment_id, user_id, text)
    }

    fn edit_reply(&self, reply_id: &str, text: &str) -> Result<()> {
        self.client.edit_reply(reply_id, text)
    }

    fn delete_reply(&self, reply_id: &str) -> Result<()> {
        self.client.delete_reply(reply_id)
    }
}

pub struct RestNotificationService {
    client: Arc<api::Client>,
}

impl RestNotificationService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl NotificationService for RestNotificationService {
    fn notify(&self, request: &NotificationRequest) -> Result<()> {
        self.client.send_notification(request)
    }

    fn unread_count(&self, user_id: &str) -> Result<i64> {
        self.client.unread_notification_count(user_id)
    }
}

#[derive(Default)]
pub struct MockFeedService;

impl FeedService for MockFeedService {
    fn load_page(&self, page: u32, _limit: u32) -> Result<Vec<Post>> {
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(mock_posts())
    }

    fn delete_post(&self, _post_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MockProfileService;

impl ProfileService for MockProfileService {
    fn lookup_user(&self, user_id: &str) -> Result<User> {
        Ok(User {
            id: user_id.to_string(),
            username: "skillhub".into(),
            display_name: "Skillhub Team".into(),
        })
    }

    fn following(&self, _user_id: &str) -> Result<Vec<User>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct MockInteractionService;

impl InteractionService for MockInteractionService {
    fn toggle_post_like(&self, _post_id: &str, _user_id: &str) -> Result<()> {
        Ok(())
    }

    fn post_like_status(&self, _post_id: &str, _user_id: &str) -> Result<bool> {
        Ok(false)
    }

    fn post_like_count(&self, _post_id: &str) -> Result<i64> {
        Ok(0)
    }

    fn toggle_comment_like(&self, _comment_id: &str, _user_id: &str) -> Result<()> {
        Ok(())
    }

    fn comment_like_status(&self, _comment_id: &str, _user_id: &str) -> Result<bool> {
        Ok(false)
    }

    fn comment_like_count(&self, _comment_id: &str) -> Result<i64> {
        Ok(0)
    }
}

#[derive(Default)]
pub struct MockCommentService;

impl CommentService for MockCommentService {
    fn load_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        Ok(vec![Comment {
            id: "c-welcome".into(),
            post_id: post_id.to_string(),
            user_id: "team".into(),
            content: "Comments are unavailable in this offline sample.".into(),
            created_at: Utc::now(),
        }])
    }

    fn create_comment(&self, post_id: &str, user_id: &str, text: &str) -> Result<Comment> {
        Ok(Comment {
            id: "c-mock".into(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            content: text.trim().to_string(),
            created_at: Utc::now(),
        })
    }

    fn edit_comment(&self, _comment_id: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    fn delete_comment(&self, _comment_id: &str) -> Result<()> {
        Ok(())
    }

    fn load_replies(&self, _comment_id: &str) -> Result<Vec<Reply>> {
        Ok(Vec::new())
    }

    fn create_reply(&self, comment_id: &str, user_id: &str, text: &str) -> Result<Reply> {
        Ok(Reply {
            id: "r-mock".into(),
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            content: text.trim().to_string(),
            created_at: Utc::now(),
        })
    }

    fn edit_reply(&self, _reply_id: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    fn delete_reply(&self, _reply_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MockNotificationService;

impl NotificationService for MockNotificationService {
    fn notify(&self, _request: &NotificationRequest) -> Result<()> {
        Ok(())
    }

    fn unread_count(&self, _user_id: &str) -> Result<i64> {
        Ok(0)
    }
}

fn mock_posts() -> Vec<Post> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let mut posts = vec![
        Post {
            id: "welcome".into(),
            user_id: "team".into(),
            description: "Welcome to Skillhub. Sample posts are shown while offline.".into(),
            media: Media::None,
            created_at: now,
        },
        Post {
            id: "shortcuts".into(),
            user_id: "team".into(),
            description: "j/k navigate, Enter opens comments, L toggles like, / searches.".into(),
            media: Media::None,
            created_at: now - ChronoDuration::minutes(5),
        },
    ];

    posts.shuffle(&mut rng);
    posts
}
