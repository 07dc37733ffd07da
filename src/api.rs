use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.skillhub.app/";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
    auth_token: Option<String>,
}

enum Body {
    Empty,
    Text(String),
    Json(serde_json::Value),
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("skillhub client user agent required");
        }
        let base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
            auth_token: config.auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn posts_page(&self, page: u32, limit: u32) -> Result<Vec<Post>> {
        let params = vec![
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let resp = self.request(Method::GET, "/api/media/getAll", &params, Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn delete_post(&self, post_id: &str) -> Result<()> {
        let path = format!("/api/media/delete/{}", post_id);
        self.request(Method::DELETE, &path, &[], Body::Empty)?;
        Ok(())
    }

    pub fn toggle_post_like(&self, post_id: &str, user_id: &str) -> Result<()> {
        let params = vec![
            ("postId".to_string(), post_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ];
        self.request(Method::POST, "/api/interactions/toggle", &params, Body::Empty)?;
        Ok(())
    }

    pub fn post_like_status(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let params = vec![
            ("postId".to_string(), post_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ];
        let resp = self.request(Method::GET, "/api/interactions/status", &params, Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn post_like_count(&self, post_id: &str) -> Result<i64> {
        let path = format!("/api/interactions/count/{}", post_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn toggle_comment_like(&self, comment_id: &str, user_id: &str) -> Result<()> {
        let params = vec![
            ("commentId".to_string(), comment_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ];
        self.request(
            Method::POST,
            "/api/comment-likes/toggle",
            &params,
            Body::Empty,
        )?;
        Ok(())
    }

    pub fn comment_like_status(&self, comment_id: &str, user_id: &str) -> Result<bool> {
        let params = vec![
            ("commentId".to_string(), comment_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ];
        let resp = self.request(
            Method::GET,
            "/api/comment-likes/status",
            &params,
            Body::Empty,
        )?;
        Ok(resp.json()?)
    }

    pub fn comment_like_count(&self, comment_id: &str) -> Result<i64> {
        let path = format!("/api/comment-likes/count/{}", comment_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        let path = format!("/api/comments/post/{}", post_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn create_comment(&self, post_id: &str, user_id: &str, text: &str) -> Result<Comment> {
        if text.trim().is_empty() {
            bail!("skillhub: comment text is required");
        }
        let params = vec![
            ("postId".to_string(), post_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ];
        let resp = self.request(
            Method::POST,
            "/api/comments",
            &params,
            Body::Text(text.trim().to_string()),
        )?;
        Ok(resp.json()?)
    }

    pub fn edit_comment(&self, comment_id: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            bail!("skillhub: comment text is required");
        }
        let path = format!("/api/comments/{}", comment_id);
        self.request(Method::PUT, &path, &[], Body::Text(text.trim().to_string()))?;
        Ok(())
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<()> {
        let path = format!("/api/comments/{}", comment_id);
        self.request(Method::DELETE, &path, &[], Body::Empty)?;
        Ok(())
    }

    pub fn replies_for_comment(&self, comment_id: &str) -> Result<Vec<Reply>> {
        let path = format!("/api/comment-replies/comment/{}", comment_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn create_reply(&self, comment_id: &str, user_id: &str, text: &str) -> Result<Reply> {
        if text.trim().is_empty() {
            bail!("skillhub: reply text is required");
        }
        let params = vec![
            ("commentId".to_string(), comment_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ];
        let resp = self.request(
            Method::POST,
            "/api/comment-replies",
            &params,
            Body::Text(text.trim().to_string()),
        )?;
        Ok(resp.json()?)
    }

    pub fn edit_reply(&self, reply_id: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            bail!("skillhub: reply text is required");
        }
        let path = format!("/api/comment-replies/{}", reply_id);
        self.request(Method::PUT, &path, &[], Body::Text(text.trim().to_string()))?;
        Ok(())
    }

    pub fn delete_reply(&self, reply_id: &str) -> Result<()> {
        let path = format!("/api/comment-replies/{}", reply_id);
        self.request(Method::DELETE, &path, &[], Body::Empty)?;
        Ok(())
    }

    pub fn send_notification(&self, notification: &NotificationRequest) -> Result<()> {
        let payload = serde_json::to_value(notification)?;
        self.request(Method::POST, "/api/notifications", &[], Body::Json(payload))?;
        Ok(())
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64> {
        let path = format!("/api/notifications/unread-count/{}", user_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn user(&self, user_id: &str) -> Result<User> {
        let path = format!("/api/users/{}", user_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    pub fn following(&self, user_id: &str) -> Result<Vec<User>> {
        let path = format!("/api/follow/following/{}", user_id);
        let resp = self.request(Method::GET, &path, &[], Body::Empty)?;
        Ok(resp.json()?)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Body,
    ) -> Result<Response> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }

        let mut req = self.http.request(method, url);
        req = req.header(USER_AGENT, self.user_agent.clone());
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Body::Empty => {}
            Body::Text(text) => {
                req = req.header(CONTENT_TYPE, "text/plain");
                req = req.body(text);
            }
            Body::Json(value) => {
                req = req.json(&value);
            }
        }

        let resp = req.send()?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            match status.as_u16() {
                401 => Err(anyhow!("skillhub: unauthorized")),
                403 => Err(anyhow!("skillhub: forbidden")),
                404 => Err(anyhow!("skillhub: not found")),
                429 => Err(anyhow!("skillhub: rate limited: {}", body)),
                _ => Err(anyhow!("skillhub: api error {}: {}", status, body)),
            }
        }
    }
}

/// Media attached to a post. Image posts carry up to three URLs but only the
/// first is ever rendered; video posts carry a single playable URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Media {
    #[default]
    None,
    Image(Vec<String>),
    Video(String),
}

impl Media {
    pub fn primary_image(&self) -> Option<&str> {
        match self {
            Media::Image(urls) => urls.first().map(|url| url.as_str()),
            _ => None,
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            Media::Video(url) => Some(url.as_str()),
            _ => None,
        }
    }

    pub fn display_url(&self) -> Option<&str> {
        match self {
            Media::None => None,
            Media::Image(_) => self.primary_image(),
            Media::Video(url) => Some(url.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub media: Media,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Sort key for display order: newest first, identifier breaks ties so
    /// equal timestamps order deterministically.
    pub fn display_key(&self) -> (i64, &str) {
        (-self.created_at.timestamp_millis(), self.id.as_str())
    }
}

impl<'de> Deserialize<'de> for Post {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct PostHelper {
            id: String,
            user_id: String,
            #[serde(default)]
            description: String,
            #[serde(default)]
            media_type: String,
            #[serde(default)]
            image_urls: Vec<String>,
            #[serde(default)]
            video_url: String,
            created_at: DateTime<Utc>,
        }

        let helper = PostHelper::deserialize(deserializer)?;
        let media = match helper.media_type.to_ascii_uppercase().as_str() {
            "IMAGE" if !helper.image_urls.is_empty() => Media::Image(helper.image_urls),
            "VIDEO" if !helper.video_url.trim().is_empty() => Media::Video(helper.video_url),
            _ => Media::None,
        };
        Ok(Post {
            id: helper.id,
            user_id: helper.user_id,
            description: helper.description,
            media,
            created_at: helper.created_at,
        })
    }
}

impl Serialize for Media {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct MediaHelper<'a> {
            media_type: &'a str,
            image_urls: &'a [String],
            video_url: &'a str,
        }

        let helper = match self {
            Media::None => MediaHelper {
                media_type: "NONE",
                image_urls: &[],
                video_url: "",
            },
            Media::Image(urls) => MediaHelper {
                media_type: "IMAGE",
                image_urls: urls,
                video_url: "",
            },
            Media::Video(url) => MediaHelper {
                media_type: "VIDEO",
                image_urls: &[],
                video_url: url,
            },
        };
        helper.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub comment_id: String,
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
}

impl User {
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub user_id: String,
    pub actor_id: String,
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_image_post() {
        let raw = r#"{
            "id": "p1",
            "userId": "u9",
            "description": "Intro to ownership",
            "mediaType": "IMAGE",
            "imageUrls": ["https://cdn.test/a.png", "https://cdn.test/b.png"],
            "videoUrl": "",
            "createdAt": "2026-03-01T12:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.media.primary_image(), Some("https://cdn.test/a.png"));
        assert!(post.media.video_url().is_none());
    }

    #[test]
    fn decodes_video_post() {
        let raw = r#"{
            "id": "p2",
            "userId": "u9",
            "description": "",
            "mediaType": "VIDEO",
            "imageUrls": [],
            "videoUrl": "https://cdn.test/clip.mp4",
            "createdAt": "2026-03-01T12:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(post.media.video_url(), Some("https://cdn.test/clip.mp4"));
    }

    #[test]
    fn empty_media_fields_decode_as_none() {
        let raw = r#"{
            "id": "p3",
            "userId": "u9",
            "description": "text only",
            "mediaType": "IMAGE",
            "imageUrls": [],
            "videoUrl": "",
            "createdAt": "2026-03-01T12:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(post.media, Media::None);
        assert!(post.media.display_url().is_none());
    }

    #[test]
    fn display_key_orders_newest_first_then_id() {
        let early: Post = serde_json::from_str(
            r#"{"id":"b","userId":"u","description":"","mediaType":"NONE",
                "imageUrls":[],"videoUrl":"","createdAt":"2026-03-01T11:00:00Z"}"#,
        )
        .unwrap();
        let late: Post = serde_json::from_str(
            r#"{"id":"a","userId":"u","description":"","mediaType":"NONE",
                "imageUrls":[],"videoUrl":"","createdAt":"2026-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        let tie: Post = serde_json::from_str(
            r#"{"id":"c","userId":"u","description":"","mediaType":"NONE",
                "imageUrls":[],"videoUrl":"","createdAt":"2026-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(late.display_key() < early.display_key());
        assert!(late.display_key() < tie.display_key());
    }

    #[test]
    fn user_label_prefers_display_name() {
        let user = User {
            id: "u1".into(),
            username: "jdoe".into(),
            display_name: "Jamie Doe".into(),
        };
        assert_eq!(user.label(), "Jamie Doe");
        let bare = User {
            id: "u2".into(),
            username: "sam".into(),
            display_name: String::new(),
        };
        assert_eq!(bare.label(), "sam");
    }
}
