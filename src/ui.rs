use std::collections::{HashMap, HashSet};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use once_cell::sync::Lazy;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use regex::Regex;
use semver::Version;
use unicode_width::UnicodeWidthChar;

use crate::api::{Comment, Media, NotificationRequest, Post, Reply, User};
use crate::config::PlayerConfig;
use crate::data::{
    CommentService, FeedService, InteractionService, NotificationService, ProfileService,
};
use crate::feed::{self, FeedState, LoadMode};
use crate::interact::LikeState;
use crate::notify::Poller;
use crate::player;
use crate::session::Session;
use crate::thread::{prepare_comment_text, CommentEntry, ThreadState};
use crate::update;

const POST_PRELOAD_THRESHOLD: usize = 5;
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_INTERVAL: Duration = Duration::from_millis(120);

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>\)\]]+").expect("compile link regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Feed,
    Content,
    Comments,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Feed => "Feed",
            Pane::Content => "Post",
            Pane::Comments => "Comments",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Feed => Pane::Content,
            Pane::Content => Pane::Comments,
            Pane::Comments => Pane::Comments,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Feed => Pane::Feed,
            Pane::Content => Pane::Feed,
            Pane::Comments => Pane::Content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ComposeKind {
    NewComment { post_id: String },
    Reply { post_id: String, comment_id: String },
    EditComment { post_id: String, comment_id: String },
    EditReply { post_id: String, reply_id: String },
}

impl ComposeKind {
    fn prompt(&self) -> &'static str {
        match self {
            ComposeKind::NewComment { .. } => "Comment",
            ComposeKind::Reply { .. } => "Reply",
            ComposeKind::EditComment { .. } => "Edit comment",
            ComposeKind::EditReply { .. } => "Edit reply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Compose(ComposeKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmAction {
    DeletePost { post_id: String },
    DeleteComment { post_id: String, comment_id: String },
    DeleteReply { post_id: String, reply_id: String },
}

impl ConfirmAction {
    fn message(&self) -> &'static str {
        match self {
            ConfirmAction::DeletePost { .. } => "Delete this post? It cannot be undone.",
            ConfirmAction::DeleteComment { .. } => "Delete this comment? It cannot be undone.",
            ConfirmAction::DeleteReply { .. } => "Delete this reply? It cannot be undone.",
        }
    }
}

struct Alert {
    title: &'static str,
    message: String,
}

/// Flattened thread item for selection: a comment or one of its replies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ThreadItem {
    Comment { comment_id: String },
    Reply { comment_id: String, reply_id: String },
}

enum AsyncResponse {
    Posts {
        request_id: u64,
        mode: LoadMode,
        result: Result<Vec<Post>>,
    },
    Author {
        user_id: String,
        result: Result<User>,
    },
    Following {
        result: Result<Vec<User>>,
    },
    PostLikeStatus {
        post_id: String,
        result: Result<bool>,
    },
    PostLikeCount {
        post_id: String,
        result: Result<i64>,
    },
    PostLikeToggled {
        post_id: String,
        error: Option<String>,
    },
    CommentLikeToggled {
        post_id: String,
        comment_id: String,
        error: Option<String>,
    },
    Thread {
        request_id: u64,
        post_id: String,
        result: Result<Vec<CommentEntry>>,
    },
    CommentCreated {
        post_id: String,
        result: Result<Comment>,
    },
    CommentEdited {
        post_id: String,
        comment_id: String,
        text: String,
        error: Option<String>,
    },
    CommentDeleted {
        post_id: String,
        comment_id: String,
        error: Option<String>,
    },
    ReplyCreated {
        post_id: String,
        comment_id: String,
        result: Result<Reply>,
    },
    ReplyEdited {
        post_id: String,
        reply_id: String,
        text: String,
        error: Option<String>,
    },
    ReplyDeleted {
        post_id: String,
        reply_id: String,
        error: Option<String>,
    },
    PostDeleted {
        post_id: String,
        error: Option<String>,
    },
    UnreadCount {
        result: Result<i64>,
    },
    Update {
        result: Result<Option<update::UpdateInfo>>,
    },
}

struct PendingPosts {
    request_id: u64,
}

struct PendingThread {
    request_id: u64,
    post_id: String,
}

struct Spinner {
    frame: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            frame: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        if self.last_tick.elapsed() >= SPINNER_INTERVAL {
            self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
            self.last_tick = Instant::now();
            true
        } else {
            false
        }
    }
}

pub struct Options {
    pub status_message: String,
    pub feed_service: Arc<dyn FeedService>,
    pub profile_service: Arc<dyn ProfileService>,
    pub comment_service: Arc<dyn CommentService>,
    pub interaction_service: Arc<dyn InteractionService>,
    pub notification_service: Arc<dyn NotificationService>,
    pub session: Arc<Session>,
    pub page_size: u32,
    pub player: PlayerConfig,
    pub config_path: String,
    pub poll_interval: Option<Duration>,
}

pub struct Model {
    status_message: String,
    feed: FeedState,
    authors: HashMap<String, User>,
    pending_authors: HashSet<String>,
    post_likes: HashMap<String, LikeState>,
    threads: HashMap<String, ThreadState>,
    visible: Vec<String>,
    selected_post: usize,
    selected_comment: usize,
    content_scroll: u16,
    search: String,
    followed_only: bool,
    focused_pane: Pane,
    input: InputMode,
    input_buffer: String,
    confirm: Option<ConfirmAction>,
    alert: Option<Alert>,
    unread_notifications: i64,
    update_notice: Option<update::UpdateInfo>,
    update_check_in_progress: bool,
    update_checked: bool,
    current_version: Version,
    spinner: Spinner,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_posts: Option<PendingPosts>,
    pending_thread: Option<PendingThread>,
    feed_service: Arc<dyn FeedService>,
    profile_service: Arc<dyn ProfileService>,
    comment_service: Arc<dyn CommentService>,
    interaction_service: Arc<dyn InteractionService>,
    notification_service: Arc<dyn NotificationService>,
    session: Arc<Session>,
    player_cfg: PlayerConfig,
    config_path: String,
    poll_interval: Option<Duration>,
    poller: Option<Poller>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            status_message: options.status_message,
            feed: FeedState::new(options.page_size),
            authors: HashMap::new(),
            pending_authors: HashSet::new(),
            post_likes: HashMap::new(),
            threads: HashMap::new(),
            visible: Vec::new(),
            selected_post: 0,
            selected_comment: 0,
            content_scroll: 0,
            search: String::new(),
            followed_only: false,
            focused_pane: Pane::Feed,
            input: InputMode::Normal,
            input_buffer: String::new(),
            confirm: None,
            alert: None,
            unread_notifications: 0,
            update_notice: None,
            update_check_in_progress: false,
            update_checked: false,
            current_version: Version::parse(crate::VERSION)
                .unwrap_or_else(|_| Version::new(0, 0, 0)),
            spinner: Spinner::new(),
            needs_redraw: true,
            response_tx,
            response_rx,
            next_request_id: 0,
            pending_posts: None,
            pending_thread: None,
            feed_service: options.feed_service,
            profile_service: options.profile_service,
            comment_service: options.comment_service,
            interaction_service: options.interaction_service,
            notification_service: options.notification_service,
            session: options.session,
            player_cfg: options.player,
            config_path: options.config_path,
            poll_interval: options.poll_interval,
            poller: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("create terminal")?;

        let result = self.event_loop(&mut terminal);

        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        disable_raw_mode().ok();
        execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
        terminal.show_cursor().ok();
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        self.reload_posts();
        self.queue_following_fetch();
        self.queue_update_check();
        self.start_notification_poller();

        loop {
            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(EVENT_POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key.code)? {
                        return Ok(());
                    }
                }
            }

            if self.poll_async() {
                self.mark_dirty();
            }
            if self.is_loading() && self.spinner.advance() {
                self.mark_dirty();
            }
        }
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.pending_posts.is_some() || self.pending_thread.is_some()
    }

    fn next_request_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    fn selected_post_id(&self) -> Option<&str> {
        self.visible.get(self.selected_post).map(|id| id.as_str())
    }

    fn selected_post(&self) -> Option<&Post> {
        self.selected_post_id().and_then(|id| self.feed.get(id))
    }

    // ----- background fetches -----

    fn reload_posts(&mut self) {
        self.load_posts(1, LoadMode::Replace);
    }

    fn load_more_posts(&mut self) {
        if self.pending_posts.is_some() || !self.feed.has_more() {
            return;
        }
        let page = self.feed.next_page();
        self.load_posts(page, LoadMode::Append);
    }

    fn load_posts(&mut self, page: u32, mode: LoadMode) {
        if self.pending_posts.is_some() {
            return;
        }
        let request_id = self.next_request_id();
        self.pending_posts = Some(PendingPosts { request_id });
        self.status_message = match mode {
            LoadMode::Replace => "Loading feed...".to_string(),
            LoadMode::Append => "Loading more posts...".to_string(),
        };
        self.mark_dirty();

        let service = Arc::clone(&self.feed_service);
        let limit = self.feed.page_size();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.load_page(page, limit);
            let _ = tx.send(AsyncResponse::Posts {
                request_id,
                mode,
                result,
            });
        });
    }

    fn queue_following_fetch(&mut self) {
        if self.session.following_loaded() {
            return;
        }
        let service = Arc::clone(&self.profile_service);
        let user_id = self.session.viewer_id().to_string();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.following(&user_id);
            let _ = tx.send(AsyncResponse::Following { result });
        });
    }

    fn queue_update_check(&mut self) {
        if self.update_checked || self.update_check_in_progress {
            return;
        }
        if std::env::var(update::SKIP_UPDATE_ENV).is_ok() {
            self.update_checked = true;
            return;
        }
        self.update_check_in_progress = true;
        let current = self.current_version.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = update::check_for_update(&current);
            let _ = tx.send(AsyncResponse::Update { result });
        });
    }

    fn start_notification_poller(&mut self) {
        let Some(interval) = self.poll_interval else {
            return;
        };
        let service = Arc::clone(&self.notification_service);
        let user_id = self.session.viewer_id().to_string();
        let tx = self.response_tx.clone();
        self.poller = Some(Poller::start(interval, move || {
            let result = service.unread_count(&user_id);
            let _ = tx.send(AsyncResponse::UnreadCount { result });
        }));
    }

    /// One author lookup per post per feed load; the author map is cleared on
    /// every replace so a fresh load re-resolves everyone.
    fn request_author_lookups(&mut self) {
        let wanted: Vec<String> = self
            .feed
            .author_ids()
            .into_iter()
            .filter(|id| !self.authors.contains_key(id) && !self.pending_authors.contains(id))
            .collect();
        for user_id in wanted {
            self.pending_authors.insert(user_id.clone());
            let service = Arc::clone(&self.profile_service);
            let tx = self.response_tx.clone();
            thread::spawn(move || {
                let result = service.lookup_user(&user_id);
                let _ = tx.send(AsyncResponse::Author { user_id, result });
            });
        }
    }

    /// Like state hydrates through two parallel requests per post; either
    /// failure leaves that value at its zero default without blocking render.
    fn request_like_hydration(&mut self) {
        let wanted: Vec<String> = self
            .feed
            .posts()
            .iter()
            .filter(|post| !self.post_likes.contains_key(&post.id))
            .map(|post| post.id.clone())
            .collect();
        for post_id in wanted {
            self.post_likes.insert(post_id.clone(), LikeState::default());
            let viewer = self.session.viewer_id().to_string();

            let service = Arc::clone(&self.interaction_service);
            let tx = self.response_tx.clone();
            let id = post_id.clone();
            let user = viewer.clone();
            thread::spawn(move || {
                let result = service.post_like_status(&id, &user);
                let _ = tx.send(AsyncResponse::PostLikeStatus {
                    post_id: id,
                    result,
                });
            });

            let service = Arc::clone(&self.interaction_service);
            let tx = self.response_tx.clone();
            thread::spawn(move || {
                let result = service.post_like_count(&post_id);
                let _ = tx.send(AsyncResponse::PostLikeCount { post_id, result });
            });
        }
    }

    fn request_thread_load(&mut self, post_id: String) {
        if self
            .pending_thread
            .as_ref()
            .is_some_and(|pending| pending.post_id == post_id)
        {
            return;
        }
        let request_id = self.next_request_id();
        self.pending_thread = Some(PendingThread {
            request_id,
            post_id: post_id.clone(),
        });
        self.mark_dirty();

        let comments = Arc::clone(&self.comment_service);
        let interactions = Arc::clone(&self.interaction_service);
        let viewer = self.session.viewer_id().to_string();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = comments.load_comments(&post_id).map(|list| {
                list.into_iter()
                    .map(|comment| {
                        let mut entry = CommentEntry::new(comment);
                        // Per-comment hydration degrades to defaults on failure
                        // instead of failing the whole thread.
                        if let Ok(liked) =
                            interactions.comment_like_status(&entry.comment.id, &viewer)
                        {
                            entry.like.hydrate_status(liked);
                        }
                        if let Ok(count) = interactions.comment_like_count(&entry.comment.id) {
                            entry.like.hydrate_count(count);
                        }
                        if let Ok(replies) = comments.load_replies(&entry.comment.id) {
                            entry.replies = replies;
                        }
                        entry
                    })
                    .collect()
            });
            let _ = tx.send(AsyncResponse::Thread {
                request_id,
                post_id,
                result,
            });
        });
    }

    // ----- async response handling -----

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Posts {
                request_id,
                mode,
                result,
            } => {
                let Some(pending) = &self.pending_posts else {
                    return;
                };
                if pending.request_id != request_id {
                    return;
                }
                self.pending_posts = None;
                match result {
                    Ok(posts) => self.apply_posts_batch(posts, mode),
                    Err(err) => {
                        // The cache stays as it was; the feed keeps rendering.
                        self.status_message = format!("Failed to load posts: {err:#}");
                    }
                }
            }
            AsyncResponse::Author { user_id, result } => {
                self.pending_authors.remove(&user_id);
                match result {
                    Ok(user) => {
                        self.authors.insert(user_id, user);
                        self.rebuild_visible();
                    }
                    Err(_) => {
                        // Raw author id remains on screen; nothing else to do.
                    }
                }
            }
            AsyncResponse::Following { result } => match result {
                Ok(users) => {
                    self.session
                        .set_following(users.into_iter().map(|user| user.id).collect());
                    if self.followed_only {
                        self.rebuild_visible();
                    }
                }
                Err(err) => {
                    self.status_message = format!("Failed to load following set: {err:#}");
                }
            },
            AsyncResponse::PostLikeStatus { post_id, result } => {
                if let (Some(state), Ok(liked)) = (self.post_likes.get_mut(&post_id), result) {
                    state.hydrate_status(liked);
                }
            }
            AsyncResponse::PostLikeCount { post_id, result } => {
                if let (Some(state), Ok(count)) = (self.post_likes.get_mut(&post_id), result) {
                    state.hydrate_count(count);
                }
            }
            AsyncResponse::PostLikeToggled { post_id, error } => {
                if let Some(state) = self.post_likes.get_mut(&post_id) {
                    match error {
                        None => state.commit(),
                        Some(err) => {
                            state.rollback();
                            self.status_message = format!("Like failed: {err}");
                        }
                    }
                }
            }
            AsyncResponse::CommentLikeToggled {
                post_id,
                comment_id,
                error,
            } => {
                if let Some(entry) = self
                    .threads
                    .get_mut(&post_id)
                    .and_then(|thread| thread.entry_mut(&comment_id))
                {
                    match error {
                        None => entry.like.commit(),
                        Some(err) => {
                            entry.like.rollback();
                            self.status_message = format!("Like failed: {err}");
                        }
                    }
                }
            }
            AsyncResponse::Thread {
                request_id,
                post_id,
                result,
            } => {
                let Some(pending) = &self.pending_thread else {
                    return;
                };
                if pending.request_id != request_id {
                    return;
                }
                self.pending_thread = None;
                match result {
                    Ok(entries) => {
                        let count = entries.len();
                        self.threads.entry(post_id).or_default().apply_loaded(entries);
                        self.selected_comment = 0;
                        self.status_message = if count == 0 {
                            "No comments yet.".to_string()
                        } else {
                            format!("Loaded {count} comments.")
                        };
                    }
                    Err(err) => {
                        // Keep the panel open with an empty default state.
                        self.status_message = format!("Failed to load comments: {err:#}");
                    }
                }
            }
            AsyncResponse::CommentCreated { post_id, result } => match result {
                Ok(comment) => {
                    if let Some(thread) = self.threads.get_mut(&post_id) {
                        thread.append(comment);
                    }
                    if self.selected_post_id() == Some(post_id.as_str()) {
                        // Scroll to the freshly appended comment.
                        self.selected_comment =
                            self.thread_items().len().saturating_sub(1);
                    }
                    self.status_message = "Comment posted.".to_string();
                }
                Err(err) => {
                    self.status_message = format!("Failed to post comment: {err:#}");
                }
            },
            AsyncResponse::CommentEdited {
                post_id,
                comment_id,
                text,
                error,
            } => match error {
                None => {
                    if let Some(thread) = self.threads.get_mut(&post_id) {
                        thread.apply_edit(&comment_id, &text);
                    }
                    self.status_message = "Comment updated.".to_string();
                }
                Some(err) => {
                    self.status_message = format!("Failed to edit comment: {err}");
                }
            },
            AsyncResponse::CommentDeleted {
                post_id,
                comment_id,
                error,
            } => match error {
                None => {
                    if let Some(thread) = self.threads.get_mut(&post_id) {
                        thread.remove(&comment_id);
                    }
                    self.clamp_comment_selection();
                    self.status_message = "Comment deleted.".to_string();
                }
                Some(err) => {
                    self.alert = Some(Alert {
                        title: "Error",
                        message: format!("Could not delete comment: {err}"),
                    });
                }
            },
            AsyncResponse::ReplyCreated {
                post_id,
                comment_id,
                result,
            } => match result {
                Ok(reply) => {
                    if let Some(thread) = self.threads.get_mut(&post_id) {
                        thread.append_reply(&comment_id, reply);
                    }
                    self.status_message = "Reply posted.".to_string();
                }
                Err(err) => {
                    self.status_message = format!("Failed to post reply: {err:#}");
                }
            },
            AsyncResponse::ReplyEdited {
                post_id,
                reply_id,
                text,
                error,
            } => match error {
                None => {
                    if let Some(thread) = self.threads.get_mut(&post_id) {
                        thread.apply_reply_edit(&reply_id, &text);
                    }
                    self.status_message = "Reply updated.".to_string();
                }
                Some(err) => {
                    self.status_message = format!("Failed to edit reply: {err}");
                }
            },
            AsyncResponse::ReplyDeleted {
                post_id,
                reply_id,
                error,
            } => match error {
                None => {
                    if let Some(thread) = self.threads.get_mut(&post_id) {
                        thread.remove_reply(&reply_id);
                    }
                    self.clamp_comment_selection();
                    self.status_message = "Reply deleted.".to_string();
                }
                Some(err) => {
                    self.alert = Some(Alert {
                        title: "Error",
                        message: format!("Could not delete reply: {err}"),
                    });
                }
            },
            AsyncResponse::PostDeleted { post_id, error } => match error {
                None => {
                    self.status_message = "Post deleted. Refreshing feed...".to_string();
                    self.threads.remove(&post_id);
                    self.post_likes.remove(&post_id);
                    // A failed refresh leaves the deleted item visible until
                    // the next successful one; that staleness is accepted.
                    self.reload_posts();
                }
                Some(err) => {
                    self.alert = Some(Alert {
                        title: "Error",
                        message: format!("Could not delete post: {err}"),
                    });
                }
            },
            AsyncResponse::UnreadCount { result } => {
                if let Ok(count) = result {
                    self.unread_notifications = count.max(0);
                }
            }
            AsyncResponse::Update { result } => {
                self.update_check_in_progress = false;
                self.update_checked = true;
                if let Ok(Some(info)) = result {
                    self.update_notice = Some(info);
                }
            }
        }
        self.mark_dirty();
    }

    fn apply_posts_batch(&mut self, posts: Vec<Post>, mode: LoadMode) {
        if matches!(mode, LoadMode::Replace) {
            // A replace is a remount: per-post state rehydrates from scratch.
            self.authors.clear();
            self.pending_authors.clear();
            self.post_likes.clear();
            self.threads.clear();
            self.pending_thread = None;
            self.selected_post = 0;
            self.selected_comment = 0;
            self.content_scroll = 0;
        }
        let added = self.feed.apply_page(posts, mode);
        self.status_message = match mode {
            LoadMode::Replace if self.feed.is_empty() => "No posts available.".to_string(),
            LoadMode::Replace => format!("Loaded {} posts.", self.feed.len()),
            LoadMode::Append if added == 0 && !self.feed.has_more() => {
                "Reached the end of the feed.".to_string()
            }
            LoadMode::Append => format!("Loaded {added} more posts ({} total).", self.feed.len()),
        };
        self.rebuild_visible();
        self.request_author_lookups();
        self.request_like_hydration();
    }

    fn rebuild_visible(&mut self) {
        let author_names: HashMap<String, String> = self
            .authors
            .iter()
            .map(|(id, user)| (id.clone(), user.label().to_string()))
            .collect();
        let following = self.session.following();
        self.visible = feed::visible_posts(
            self.feed.posts(),
            &author_names,
            &self.search,
            self.followed_only,
            &following,
        )
        .into_iter()
        .map(|post| post.id.clone())
        .collect();
        if self.selected_post >= self.visible.len() {
            self.selected_post = self.visible.len().saturating_sub(1);
        }
        self.mark_dirty();
    }

    // ----- key handling -----

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.alert.is_some() {
            self.alert = None;
            self.mark_dirty();
            return Ok(false);
        }

        if self.confirm.is_some() {
            self.handle_confirm_key(code);
            return Ok(false);
        }

        match self.input.clone() {
            InputMode::Search => {
                self.handle_search_key(code);
                return Ok(false);
            }
            InputMode::Compose(kind) => {
                self.handle_compose_key(code, kind);
                return Ok(false);
            }
            InputMode::Normal => {}
        }

        let mut dirty = true;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('r') | KeyCode::Char('R') if self.focused_pane != Pane::Comments => {
                self.reload_posts();
            }
            KeyCode::Char('r') if self.focused_pane == Pane::Comments => {
                self.refresh_thread();
            }
            KeyCode::Char('n') => self.load_more_posts(),
            KeyCode::Char('/') => {
                self.input = InputMode::Search;
                self.input_buffer = self.search.clone();
            }
            KeyCode::Char('f') => {
                self.followed_only = !self.followed_only;
                self.status_message = if self.followed_only {
                    "Showing followed authors only.".to_string()
                } else {
                    "Showing everyone.".to_string()
                };
                self.rebuild_visible();
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.focused_pane = self.focused_pane.previous();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Char('j') | KeyCode::Down => self.navigate_in_focus(1),
            KeyCode::Char('k') | KeyCode::Up => self.navigate_in_focus(-1),
            KeyCode::Enter => {
                if matches!(self.focused_pane, Pane::Feed | Pane::Content) {
                    self.toggle_comments_panel();
                }
            }
            KeyCode::Char('L') => self.toggle_selected_like(),
            KeyCode::Char('c') => self.compose_new_comment(),
            KeyCode::Char('R') if self.focused_pane == Pane::Comments => {
                self.compose_reply();
            }
            KeyCode::Char('e') if self.focused_pane == Pane::Comments => {
                self.compose_edit();
            }
            KeyCode::Char('d') => {
                if self.focused_pane == Pane::Comments {
                    self.confirm_delete_thread_item();
                } else {
                    self.confirm_delete_post();
                }
            }
            KeyCode::Char('o') => self.open_selected_link(),
            KeyCode::Char('v') => self.play_selected_video(),
            KeyCode::Char('?') => self.show_help(),
            _ => dirty = false,
        }
        if dirty {
            self.mark_dirty();
        }
        Ok(false)
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(action) = self.confirm.take() {
                    self.execute_confirmed(action);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                self.status_message = "Cancelled.".to_string();
            }
            _ => {}
        }
        self.mark_dirty();
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.search = self.input_buffer.trim().to_string();
                self.input = InputMode::Normal;
                self.input_buffer.clear();
                // Filtering never touches the network; it re-derives the view
                // from the cache already in memory.
                self.rebuild_visible();
                self.status_message = if self.search.is_empty() {
                    "Search cleared.".to_string()
                } else {
                    format!("Filtering by \"{}\".", self.search)
                };
            }
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(ch) => self.input_buffer.push(ch),
            _ => {}
        }
        self.mark_dirty();
    }

    fn handle_compose_key(&mut self, code: KeyCode, kind: ComposeKind) {
        match code {
            KeyCode::Enter => {
                let text = match prepare_comment_text(&self.input_buffer) {
                    Some(text) => text,
                    None => {
                        // Empty input is a silent no-op; nothing is sent.
                        return;
                    }
                };
                self.input = InputMode::Normal;
                self.input_buffer.clear();
                self.submit_compose(kind, text);
            }
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(ch) => self.input_buffer.push(ch),
            _ => {}
        }
        self.mark_dirty();
    }

    fn navigate_in_focus(&mut self, delta: i32) {
        match self.focused_pane {
            Pane::Feed => {
                if self.visible.is_empty() {
                    return;
                }
                let len = self.visible.len() as i32;
                let next = (self.selected_post as i32 + delta).clamp(0, len - 1) as usize;
                if next != self.selected_post {
                    self.selected_post = next;
                    self.selected_comment = 0;
                    self.content_scroll = 0;
                }
                // Keep scrolling smooth by requesting the next page before the
                // viewer hits the end.
                if self.selected_post + POST_PRELOAD_THRESHOLD >= self.visible.len() {
                    self.load_more_posts();
                }
            }
            Pane::Content => {
                if delta > 0 {
                    self.content_scroll = self.content_scroll.saturating_add(delta as u16);
                } else {
                    self.content_scroll = self.content_scroll.saturating_sub((-delta) as u16);
                }
            }
            Pane::Comments => {
                let items = self.thread_items();
                if items.is_empty() {
                    return;
                }
                let len = items.len() as i32;
                self.selected_comment =
                    (self.selected_comment as i32 + delta).clamp(0, len - 1) as usize;
            }
        }
        self.mark_dirty();
    }

    fn toggle_comments_panel(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let thread = self.threads.entry(post_id.clone()).or_default();
        let needs_fetch = thread.toggle_expanded();
        if thread.is_expanded() {
            self.focused_pane = Pane::Comments;
            self.selected_comment = 0;
        } else if self.focused_pane == Pane::Comments {
            self.focused_pane = Pane::Feed;
        }
        if needs_fetch {
            self.status_message = "Loading comments...".to_string();
            self.request_thread_load(post_id);
        }
        self.mark_dirty();
    }

    /// Drops the cached thread and refetches it from the server. Edits and
    /// deletes patch the cache in place, so this is the only path that picks
    /// up other viewers' activity without collapsing the panel.
    fn refresh_thread(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let Some(thread) = self.threads.get_mut(&post_id) else {
            return;
        };
        if !thread.is_expanded() {
            return;
        }
        thread.invalidate();
        self.selected_comment = 0;
        self.status_message = "Reloading comments...".to_string();
        self.request_thread_load(post_id);
    }

    fn toggle_selected_like(&mut self) {
        if self.focused_pane == Pane::Comments {
            self.toggle_selected_comment_like();
        } else {
            self.toggle_selected_post_like();
        }
    }

    fn toggle_selected_post_like(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let state = self.post_likes.entry(post_id.clone()).or_default();
        if !state.begin_toggle() {
            // A toggle is already on the wire; this press is ignored.
            return;
        }
        self.mark_dirty();

        let service = Arc::clone(&self.interaction_service);
        let viewer = self.session.viewer_id().to_string();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let error = service
                .toggle_post_like(&post_id, &viewer)
                .err()
                .map(|err| format!("{err:#}"));
            let _ = tx.send(AsyncResponse::PostLikeToggled { post_id, error });
        });
    }

    fn toggle_selected_comment_like(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let Some(ThreadItem::Comment { comment_id }) = self.selected_thread_item() else {
            return;
        };
        let Some(entry) = self
            .threads
            .get_mut(&post_id)
            .and_then(|thread| thread.entry_mut(&comment_id))
        else {
            return;
        };
        if !entry.like.begin_toggle() {
            return;
        }
        self.mark_dirty();

        let service = Arc::clone(&self.interaction_service);
        let viewer = self.session.viewer_id().to_string();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let error = service
                .toggle_comment_like(&comment_id, &viewer)
                .err()
                .map(|err| format!("{err:#}"));
            let _ = tx.send(AsyncResponse::CommentLikeToggled {
                post_id,
                comment_id,
                error,
            });
        });
    }

    fn compose_new_comment(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let expanded = self
            .threads
            .get(&post_id)
            .map(|thread| thread.is_expanded())
            .unwrap_or(false);
        if !expanded {
            self.toggle_comments_panel();
        }
        self.input = InputMode::Compose(ComposeKind::NewComment { post_id });
        self.input_buffer.clear();
        self.mark_dirty();
    }

    fn compose_reply(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let Some(item) = self.selected_thread_item() else {
            return;
        };
        let comment_id = match item {
            ThreadItem::Comment { comment_id } => comment_id,
            ThreadItem::Reply { comment_id, .. } => comment_id,
        };
        self.input = InputMode::Compose(ComposeKind::Reply {
            post_id,
            comment_id,
        });
        self.input_buffer.clear();
        self.mark_dirty();
    }

    fn compose_edit(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let Some(item) = self.selected_thread_item() else {
            return;
        };
        let Some(thread) = self.threads.get(&post_id) else {
            return;
        };
        match item {
            ThreadItem::Comment { comment_id } => {
                let Some(entry) = thread.entry(&comment_id) else {
                    return;
                };
                // Controls for other people's comments are hidden; the server
                // re-validates regardless.
                if !self.session.owns(&entry.comment.user_id) {
                    self.status_message = "You can only edit your own comments.".to_string();
                    self.mark_dirty();
                    return;
                }
                self.input_buffer = entry.comment.content.clone();
                self.input = InputMode::Compose(ComposeKind::EditComment {
                    post_id,
                    comment_id,
                });
            }
            ThreadItem::Reply {
                comment_id,
                reply_id,
            } => {
                let Some(reply) = thread
                    .entry(&comment_id)
                    .and_then(|entry| entry.replies.iter().find(|reply| reply.id == reply_id))
                else {
                    return;
                };
                if !self.session.owns(&reply.user_id) {
                    self.status_message = "You can only edit your own replies.".to_string();
                    self.mark_dirty();
                    return;
                }
                self.input_buffer = reply.content.clone();
                self.input = InputMode::Compose(ComposeKind::EditReply { post_id, reply_id });
            }
        }
        self.mark_dirty();
    }

    fn confirm_delete_post(&mut self) {
        let Some(post) = self.selected_post() else {
            return;
        };
        if !self.session.owns(&post.user_id) {
            self.status_message = "You can only delete your own posts.".to_string();
            self.mark_dirty();
            return;
        }
        self.confirm = Some(ConfirmAction::DeletePost {
            post_id: post.id.clone(),
        });
        self.mark_dirty();
    }

    fn confirm_delete_thread_item(&mut self) {
        let Some(post_id) = self.selected_post_id().map(str::to_string) else {
            return;
        };
        let Some(item) = self.selected_thread_item() else {
            return;
        };
        let Some(thread) = self.threads.get(&post_id) else {
            return;
        };
        match item {
            ThreadItem::Comment { comment_id } => {
                let Some(entry) = thread.entry(&comment_id) else {
                    return;
                };
                if !self.session.owns(&entry.comment.user_id) {
                    self.status_message = "You can only delete your own comments.".to_string();
                    self.mark_dirty();
                    return;
                }
                self.confirm = Some(ConfirmAction::DeleteComment {
                    post_id,
                    comment_id,
                });
            }
            ThreadItem::Reply {
                comment_id,
                reply_id,
            } => {
                let Some(reply) = thread
                    .entry(&comment_id)
                    .and_then(|entry| entry.replies.iter().find(|reply| reply.id == reply_id))
                else {
                    return;
                };
                if !self.session.owns(&reply.user_id) {
                    self.status_message = "You can only delete your own replies.".to_string();
                    self.mark_dirty();
                    return;
                }
                self.confirm = Some(ConfirmAction::DeleteReply { post_id, reply_id });
            }
        }
        self.mark_dirty();
    }

    fn execute_confirmed(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeletePost { post_id } => {
                self.status_message = "Deleting post...".to_string();
                let service = Arc::clone(&self.feed_service);
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let error = service
                        .delete_post(&post_id)
                        .err()
                        .map(|err| format!("{err:#}"));
                    let _ = tx.send(AsyncResponse::PostDeleted { post_id, error });
                });
            }
            ConfirmAction::DeleteComment {
                post_id,
                comment_id,
            } => {
                self.status_message = "Deleting comment...".to_string();
                let service = Arc::clone(&self.comment_service);
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let error = service
                        .delete_comment(&comment_id)
                        .err()
                        .map(|err| format!("{err:#}"));
                    let _ = tx.send(AsyncResponse::CommentDeleted {
                        post_id,
                        comment_id,
                        error,
                    });
                });
            }
            ConfirmAction::DeleteReply { post_id, reply_id } => {
                self.status_message = "Deleting reply...".to_string();
                let service = Arc::clone(&self.comment_service);
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let error = service
                        .delete_reply(&reply_id)
                        .err()
                        .map(|err| format!("{err:#}"));
                    let _ = tx.send(AsyncResponse::ReplyDeleted {
                        post_id,
                        reply_id,
                        error,
                    });
                });
            }
        }
        self.mark_dirty();
    }

    fn submit_compose(&mut self, kind: ComposeKind, text: String) {
        match kind {
            ComposeKind::NewComment { post_id } => {
                self.status_message = "Posting comment...".to_string();
                let service = Arc::clone(&self.comment_service);
                let viewer = self.session.viewer_id().to_string();
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let result = service.create_comment(&post_id, &viewer, &text);
                    let _ = tx.send(AsyncResponse::CommentCreated { post_id, result });
                });
            }
            ComposeKind::Reply {
                post_id,
                comment_id,
            } => {
                self.status_message = "Posting reply...".to_string();
                let service = Arc::clone(&self.comment_service);
                let notifications = Arc::clone(&self.notification_service);
                let viewer = self.session.viewer_id().to_string();
                let recipient = self
                    .threads
                    .get(&post_id)
                    .and_then(|thread| thread.entry(&comment_id))
                    .map(|entry| entry.comment.user_id.clone())
                    .unwrap_or_default();
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let result = service.create_reply(&comment_id, &viewer, &text);
                    if result.is_ok() && !recipient.is_empty() {
                        // Fire-and-forget: a failed notification never fails
                        // the reply itself.
                        let _ = notifications.notify(&NotificationRequest {
                            user_id: recipient,
                            actor_id: viewer,
                            kind: "REPLY".to_string(),
                            message: "replied to your comment".to_string(),
                        });
                    }
                    let _ = tx.send(AsyncResponse::ReplyCreated {
                        post_id,
                        comment_id,
                        result,
                    });
                });
            }
            ComposeKind::EditComment {
                post_id,
                comment_id,
            } => {
                self.status_message = "Saving comment...".to_string();
                let service = Arc::clone(&self.comment_service);
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let error = service
                        .edit_comment(&comment_id, &text)
                        .err()
                        .map(|err| format!("{err:#}"));
                    let _ = tx.send(AsyncResponse::CommentEdited {
                        post_id,
                        comment_id,
                        text,
                        error,
                    });
                });
            }
            ComposeKind::EditReply { post_id, reply_id } => {
                self.status_message = "Saving reply...".to_string();
                let service = Arc::clone(&self.comment_service);
                let tx = self.response_tx.clone();
                thread::spawn(move || {
                    let error = service
                        .edit_reply(&reply_id, &text)
                        .err()
                        .map(|err| format!("{err:#}"));
                    let _ = tx.send(AsyncResponse::ReplyEdited {
                        post_id,
                        reply_id,
                        text,
                        error,
                    });
                });
            }
        }
        self.mark_dirty();
    }

    fn open_selected_link(&mut self) {
        let Some(post) = self.selected_post() else {
            return;
        };
        let url = post
            .media
            .display_url()
            .map(str::to_string)
            .or_else(|| extract_links(&post.description).into_iter().next());
        match url {
            Some(url) => {
                self.status_message = match webbrowser::open(&url) {
                    Ok(_) => format!("Opened {url}"),
                    Err(err) => format!("Failed to open {url}: {err}"),
                };
            }
            None => {
                self.status_message = "No link on this post.".to_string();
            }
        }
        self.mark_dirty();
    }

    fn play_selected_video(&mut self) {
        let Some(post) = self.selected_post() else {
            return;
        };
        let Some(url) = post.media.video_url().map(str::to_string) else {
            self.status_message = "Selected post has no video.".to_string();
            self.mark_dirty();
            return;
        };
        self.status_message = match player::play(&self.player_cfg, &url) {
            Ok(_) => "Launched video player.".to_string(),
            Err(err) => format!("Video playback failed: {err:#}"),
        };
        self.mark_dirty();
    }

    fn show_help(&mut self) {
        self.alert = Some(Alert {
            title: "Help",
            message: format!(
                "j/k move · h/l panes · Enter comments · L like · c comment · R reply · \
                 e edit · d delete · / search · f following · r refresh · n more · \
                 o open link · v play video · q quit\n\nConfig: {}",
                self.config_path
            ),
        });
        self.mark_dirty();
    }

    // ----- thread selection helpers -----

    fn selected_thread(&self) -> Option<&ThreadState> {
        self.selected_post_id().and_then(|id| self.threads.get(id))
    }

    fn thread_items(&self) -> Vec<ThreadItem> {
        let Some(thread) = self.selected_thread() else {
            return Vec::new();
        };
        let mut items = Vec::new();
        for entry in thread.entries() {
            items.push(ThreadItem::Comment {
                comment_id: entry.comment.id.clone(),
            });
            for reply in &entry.replies {
                items.push(ThreadItem::Reply {
                    comment_id: entry.comment.id.clone(),
                    reply_id: reply.id.clone(),
                });
            }
        }
        items
    }

    fn selected_thread_item(&self) -> Option<ThreadItem> {
        self.thread_items().into_iter().nth(self.selected_comment)
    }

    fn clamp_comment_selection(&mut self) {
        let len = self.thread_items().len();
        if self.selected_comment >= len {
            self.selected_comment = len.saturating_sub(1);
        }
    }

    // ----- drawing -----

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.size();
        let mut rows = vec![Constraint::Min(3), Constraint::Length(1)];
        if self.update_notice.is_some() {
            rows.insert(0, Constraint::Length(1));
        }
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints(rows)
            .split(area);

        let (banner_area, main_area, status_area) = if self.update_notice.is_some() {
            (Some(vertical[0]), vertical[1], vertical[2])
        } else {
            (None, vertical[0], vertical[1])
        };

        if let (Some(area), Some(notice)) = (banner_area, &self.update_notice) {
            let banner = Paragraph::new(format!(
                "Update available: {} -> {}  ({})",
                self.current_version, notice.version, notice.release_url
            ))
            .style(Style::default().fg(Color::Black).bg(Color::Yellow));
            frame.render_widget(banner, area);
        }

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
            .split(main_area);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(columns[1]);

        self.draw_feed(frame, columns[0]);
        self.draw_content(frame, right[0]);
        self.draw_comments(frame, right[1]);
        self.draw_status(frame, status_area);

        if self.input != InputMode::Normal {
            self.draw_input_overlay(frame, area);
        }
        if let Some(action) = &self.confirm {
            draw_modal(frame, area, "Confirm", action.message(), "y confirm · n cancel");
        }
        if let Some(alert) = &self.alert {
            draw_modal(frame, area, alert.title, &alert.message, "press any key");
        }
    }

    fn pane_block(&self, pane: Pane) -> Block<'static> {
        let mut block = Block::default().borders(Borders::ALL).title(pane.title());
        if self.focused_pane == pane {
            block = block.border_style(Style::default().fg(Color::Cyan));
        }
        block
    }

    fn draw_feed(&self, frame: &mut Frame<'_>, area: Rect) {
        let width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = self
            .visible
            .iter()
            .filter_map(|id| self.feed.get(id))
            .map(|post| {
                let author = self.author_label(&post.user_id);
                let like = self.post_likes.get(&post.id);
                let liked = like.map(|state| state.liked()).unwrap_or(false);
                let count = like.map(|state| state.count()).unwrap_or(0);
                let heart = if liked { "♥" } else { "♡" };
                let meta = Line::from(vec![
                    Span::styled(
                        format!("@{author}"),
                        Style::default().fg(Color::Green),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        time_ago(post.created_at),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        format!("{heart} {count}"),
                        if liked {
                            Style::default().fg(Color::Red)
                        } else {
                            Style::default().fg(Color::DarkGray)
                        },
                    ),
                    Span::raw(media_badge(&post.media)),
                ]);
                let body = Line::from(Span::raw(truncate_to_width(
                    first_line(&post.description),
                    width,
                )));
                ListItem::new(Text::from(vec![meta, body]))
            })
            .collect();

        let empty = items.is_empty();
        let list = List::new(items)
            .block(self.pane_block(Pane::Feed))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );
        let mut state = ListState::default();
        if !empty {
            state.select(Some(self.selected_post.min(self.visible.len().saturating_sub(1))));
        }
        frame.render_stateful_widget(list, area, &mut state);

        if empty {
            let hint = if self.pending_posts.is_some() {
                format!("{} Loading posts...", self.spinner.frame())
            } else if !self.search.is_empty() || self.followed_only {
                "No posts match the current filter.".to_string()
            } else {
                "No posts available.".to_string()
            };
            let inner = Rect {
                x: area.x + 2,
                y: area.y + 1,
                width: area.width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(
                Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
                inner,
            );
        }
    }

    fn draw_content(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Content);
        let Some(post) = self.selected_post() else {
            frame.render_widget(
                Paragraph::new("Select a post to read it.")
                    .block(block)
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        };

        let author = self.author_label(&post.user_id);
        let mut header = vec![
            Span::styled(
                format!("@{author}"),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                post.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if self.session.follows(&post.user_id) {
            header.push(Span::styled(
                "  · following",
                Style::default().fg(Color::Magenta),
            ));
        }
        let mut lines = vec![Line::from(header), Line::default()];
        let wrap_width = area.width.saturating_sub(4).max(16) as usize;
        for wrapped in textwrap::wrap(&post.description, wrap_width) {
            lines.push(Line::from(wrapped.into_owned()));
        }
        if let Some(media_line) = render_media(&post.media) {
            lines.push(Line::default());
            lines.push(media_line);
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.content_scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_comments(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Comments);
        let expanded = self
            .selected_thread()
            .map(|thread| thread.is_expanded())
            .unwrap_or(false);

        if !expanded {
            frame.render_widget(
                Paragraph::new("Press Enter to show comments.")
                    .block(block)
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        }

        let loading = self
            .pending_thread
            .as_ref()
            .zip(self.selected_post_id())
            .is_some_and(|(pending, id)| pending.post_id == id);
        if loading {
            frame.render_widget(
                Paragraph::new(format!("{} Loading comments...", self.spinner.frame()))
                    .block(block)
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        }

        let Some(thread) = self.selected_thread() else {
            frame.render_widget(Paragraph::new("").block(block), area);
            return;
        };
        if thread.is_empty() {
            frame.render_widget(
                Paragraph::new("No comments yet. Press c to write one.")
                    .block(block)
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        }

        let width = area.width.saturating_sub(6).max(16) as usize;
        let mut items: Vec<ListItem> = Vec::new();
        for entry in thread.entries() {
            let author = self.author_label(&entry.comment.user_id);
            let heart = if entry.like.liked() { "♥" } else { "♡" };
            let mut lines = vec![Line::from(vec![
                Span::styled(format!("@{author}"), Style::default().fg(Color::Green)),
                Span::raw("  "),
                Span::styled(
                    time_ago(entry.comment.created_at),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("{heart} {}", entry.like.count()),
                    Style::default().fg(Color::DarkGray),
                ),
            ])];
            for wrapped in textwrap::wrap(&entry.comment.content, width) {
                lines.push(Line::from(wrapped.into_owned()));
            }
            items.push(ListItem::new(Text::from(lines)));

            for reply in &entry.replies {
                let author = self.author_label(&reply.user_id);
                let mut lines = vec![Line::from(vec![
                    Span::raw("  ↳ "),
                    Span::styled(format!("@{author}"), Style::default().fg(Color::Green)),
                    Span::raw("  "),
                    Span::styled(
                        time_ago(reply.created_at),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])];
                for wrapped in textwrap::wrap(&reply.content, width.saturating_sub(4).max(8)) {
                    lines.push(Line::from(format!("    {wrapped}")));
                }
                items.push(ListItem::new(Text::from(lines)));
            }
        }

        let item_count = items.len();
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(self.selected_comment.min(item_count.saturating_sub(1))));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = Vec::new();
        if self.is_loading() {
            spans.push(Span::styled(
                format!("{} ", self.spinner.frame()),
                Style::default().fg(Color::Cyan),
            ));
        }
        spans.push(Span::raw(self.status_message.clone()));
        if !self.search.is_empty() {
            spans.push(Span::styled(
                format!("  /{}", self.search),
                Style::default().fg(Color::Yellow),
            ));
        }
        if self.followed_only {
            spans.push(Span::styled(
                "  [following]",
                Style::default().fg(Color::Magenta),
            ));
        }
        if self.unread_notifications > 0 {
            spans.push(Span::styled(
                format!("  🔔 {}", self.unread_notifications),
                Style::default().fg(Color::Yellow),
            ));
        }
        let left = Line::from(spans);

        let help = Span::styled(
            "q quit · / search · f following · L like · Enter comments · c comment",
            Style::default().fg(Color::DarkGray),
        );
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(help.width() as u16)])
            .split(area);
        frame.render_widget(Paragraph::new(left), columns[0]);
        frame.render_widget(
            Paragraph::new(Line::from(help)).alignment(Alignment::Right),
            columns[1],
        );
    }

    fn draw_input_overlay(&self, frame: &mut Frame<'_>, area: Rect) {
        let prompt = match &self.input {
            InputMode::Search => "Search",
            InputMode::Compose(kind) => kind.prompt(),
            InputMode::Normal => return,
        };
        let popup = centered_rect(70, 3, area);
        frame.render_widget(Clear, popup);
        let paragraph = Paragraph::new(format!("{}█", self.input_buffer)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{prompt} (Enter to submit, Esc to cancel)")),
        );
        frame.render_widget(paragraph, popup);
    }

    fn author_label(&self, user_id: &str) -> String {
        self.authors
            .get(user_id)
            .map(|user| user.label().to_string())
            .unwrap_or_else(|| user_id.to_string())
    }
}

fn draw_modal(frame: &mut Frame<'_>, area: Rect, title: &str, message: &str, footer: &str) {
    let popup = centered_rect(60, 5, area);
    frame.render_widget(Clear, popup);
    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            footer.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    // Widened before multiplying; u16 math overflows on very wide terminals.
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height: height.min(area.height),
    }
}

/// Pure media dispatch: image posts render their first URL only, video posts
/// a single playable line, bare posts nothing.
fn render_media(media: &Media) -> Option<Line<'static>> {
    match media {
        Media::None => None,
        Media::Image(_) => media.primary_image().map(|url| {
            Line::from(vec![
                Span::styled("[image] ", Style::default().fg(Color::Blue)),
                Span::raw(url.to_string()),
            ])
        }),
        Media::Video(url) => Some(Line::from(vec![
            Span::styled("[video] ", Style::default().fg(Color::Blue)),
            Span::raw(url.clone()),
            Span::styled("  (v to play)", Style::default().fg(Color::DarkGray)),
        ])),
    }
}

fn media_badge(media: &Media) -> &'static str {
    match media {
        Media::None => "",
        Media::Image(_) => "  [img]",
        Media::Video(_) => "  [vid]",
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += ch_width;
        out.push(ch);
    }
    out
}

fn extract_links(text: &str) -> Vec<String> {
    LINK_RE
        .find_iter(text)
        .map(|hit| hit.as_str().trim_end_matches(['.', ',', ';']).to_string())
        .collect()
}

fn time_ago(when: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(when);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn truncate_respects_column_width() {
        assert_eq!(truncate_to_width("short", 20), "short");
        assert_eq!(truncate_to_width("a longer description", 8), "a longe…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn extract_links_finds_and_trims_urls() {
        let links = extract_links("see https://example.test/page. and http://other.test/x,");
        assert_eq!(
            links,
            ["https://example.test/page", "http://other.test/x"]
        );
        assert!(extract_links("no links here").is_empty());
    }

    #[test]
    fn media_rendering_dispatches_on_variant() {
        assert!(render_media(&Media::None).is_none());
        let image = Media::Image(vec!["https://cdn.test/a.png".into(), "https://cdn.test/b.png".into()]);
        let line = render_media(&image).unwrap();
        let rendered: String = line.spans.iter().map(|span| span.content.clone()).collect();
        assert!(rendered.contains("a.png"));
        assert!(!rendered.contains("b.png"), "only the first image renders");
        assert!(render_media(&Media::Video("https://cdn.test/v.mp4".into())).is_some());
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now), "just now");
        assert_eq!(time_ago(now - ChronoDuration::minutes(5)), "5m ago");
        assert_eq!(time_ago(now - ChronoDuration::hours(3)), "3h ago");
        assert_eq!(time_ago(now - ChronoDuration::days(2)), "2d ago");
    }

    #[test]
    fn pane_cycle_is_bounded() {
        assert_eq!(Pane::Feed.previous(), Pane::Feed);
        assert_eq!(Pane::Feed.next(), Pane::Content);
        assert_eq!(Pane::Comments.next(), Pane::Comments);
    }

    #[test]
    fn centered_rect_handles_wide_terminals() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 2000,
            height: 50,
        };
        let rect = centered_rect(70, 5, area);
        assert_eq!(rect.width, 1400);
        assert_eq!(rect.height, 5);
        assert_eq!(rect.x, 300);
    }

    fn offline_model() -> Model {
        Model::new(Options {
            status_message: String::new(),
            feed_service: Arc::new(crate::data::MockFeedService),
            profile_service: Arc::new(crate::data::MockProfileService),
            comment_service: Arc::new(crate::data::MockCommentService),
            interaction_service: Arc::new(crate::data::MockInteractionService),
            notification_service: Arc::new(crate::data::MockNotificationService),
            session: Arc::new(Session::new(User {
                id: "u1".into(),
                username: "viewer".into(),
                display_name: String::new(),
            })),
            page_size: 5,
            player: crate::config::PlayerConfig::default(),
            config_path: "~/.config/skillhub-tui/config.yaml".into(),
            poll_interval: None,
        })
    }

    fn sample_post(id: &str) -> Post {
        Post {
            id: id.into(),
            user_id: "team".into(),
            description: "sample".into(),
            media: Media::None,
            created_at: Utc::now(),
        }
    }

    fn wait_until(model: &mut Model, what: &str, cond: impl Fn(&Model) -> bool) {
        for _ in 0..400 {
            model.poll_async();
            if cond(model) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("timed out waiting for {what}");
    }

    #[test]
    fn comment_pane_refresh_refetches_the_thread() {
        let mut model = offline_model();
        model.apply_posts_batch(vec![sample_post("p1")], LoadMode::Replace);
        assert_eq!(model.visible.len(), 1);

        model.toggle_comments_panel();
        wait_until(&mut model, "initial thread load", |m| {
            m.selected_thread().is_some_and(|t| t.has_loaded())
        });
        assert_eq!(model.selected_thread().unwrap().len(), 1);

        model.focused_pane = Pane::Comments;
        model.refresh_thread();
        // Nothing is applied until the response is polled off the channel.
        assert!(!model.selected_thread().unwrap().has_loaded());
        assert!(model.selected_thread().unwrap().is_expanded());

        wait_until(&mut model, "thread reload", |m| {
            m.selected_thread().is_some_and(|t| t.has_loaded())
        });
        assert_eq!(model.selected_thread().unwrap().len(), 1);
    }
}
