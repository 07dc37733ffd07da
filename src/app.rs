use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api;
use crate::config;
use crate::data::{
    self, CommentService, FeedService, InteractionService, NotificationService, ProfileService,
};
use crate::session::{Session, SessionError};
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let user_agent = if cfg.api.user_agent.trim().is_empty() {
        format!("skillhub-tui/{}", crate::VERSION)
    } else {
        cfg.api.user_agent.clone()
    };

    let feed_service: Arc<dyn FeedService>;
    let profile_service: Arc<dyn ProfileService>;
    let comment_service: Arc<dyn CommentService>;
    let interaction_service: Arc<dyn InteractionService>;
    let notification_service: Arc<dyn NotificationService>;
    let session: Arc<Session>;
    let status: String;

    if cfg.api.user_id.trim().is_empty() {
        // No account configured: browse a canned offline feed so the UI is
        // usable before credentials are set up.
        feed_service = Arc::new(data::MockFeedService);
        profile_service = Arc::new(data::MockProfileService);
        comment_service = Arc::new(data::MockCommentService);
        interaction_service = Arc::new(data::MockInteractionService);
        notification_service = Arc::new(data::MockNotificationService);
        session = Arc::new(Session::new(demo_viewer()));
        status = format!(
            "Offline demo mode ({}). Config: {display_path}",
            SessionError::MissingViewer
        );
    } else {
        let client = Arc::new(
            api::Client::new(api::ClientConfig {
                user_agent,
                base_url: Some(cfg.api.base_url.clone()),
                auth_token: (!cfg.api.auth_token.trim().is_empty())
                    .then(|| cfg.api.auth_token.clone()),
                http_client: None,
            })
            .context("create api client")?,
        );

        let viewer = client
            .user(&cfg.api.user_id)
            .with_context(|| format!("look up configured user {}", cfg.api.user_id))?;
        session = Arc::new(Session::new(viewer));

        feed_service = Arc::new(data::RestFeedService::new(client.clone()));
        profile_service = Arc::new(data::RestProfileService::new(client.clone()));
        comment_service = Arc::new(data::RestCommentService::new(client.clone()));
        interaction_service = Arc::new(data::RestInteractionService::new(client.clone()));
        notification_service = Arc::new(data::RestNotificationService::new(client));
        status = format!(
            "Signed in as @{}. j/k to navigate, Enter for comments, q to quit.",
            session.viewer().label()
        );
    }

    let poll_interval = cfg
        .notifications
        .enabled
        .then_some(cfg.notifications.poll_interval)
        .filter(|interval| *interval >= Duration::from_secs(1));

    let options = ui::Options {
        status_message: status,
        feed_service,
        profile_service,
        comment_service,
        interaction_service,
        notification_service,
        session,
        page_size: cfg.feed.page_size,
        player: cfg.player.clone(),
        config_path: display_path,
        poll_interval,
    };

    let mut model = ui::Model::new(options);
    model.run()
}

fn demo_viewer() -> api::User {
    api::User {
        id: "demo".to_string(),
        username: "demo".to_string(),
        display_name: "Demo Learner".to_string(),
    }
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/skillhub-tui/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_path_abbreviates_home() {
        if let Some(home) = dirs::home_dir() {
            let inside = home.join(".config/skillhub-tui/config.yaml");
            assert_eq!(
                friendly_path(Some(&inside)),
                "~/.config/skillhub-tui/config.yaml"
            );
        }
        let outside = std::path::PathBuf::from("/etc/skillhub/config.yaml");
        assert_eq!(friendly_path(Some(&outside)), "/etc/skillhub/config.yaml");
    }
}
