use std::fmt;

/// Default embed color (green).
pub const DEFAULT_COLOR: u32 = 0x00ff00;

/// A formatted log entry rendered as a single chat embed.
#[derive(Clone, Debug, PartialEq)]
pub struct LogMessage {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub thumbnail_url: Option<String>,
}

impl LogMessage {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        LogMessage {
            title: title.into(),
            description: description.into(),
            color: DEFAULT_COLOR,
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// A unit of work for the bot. Each task is delivered at most once.
#[derive(Clone, PartialEq)]
pub enum NotificationTask {
    /// Post a message to the log channel.
    SendLog(LogMessage),
    /// Grant the verified role to a guild member.
    AssignRole { user_id: String },
    /// Add the user to the guild using their own OAuth access token.
    JoinGuild {
        user_id: String,
        access_token: String,
    },
}

impl NotificationTask {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationTask::SendLog(_) => "send_log",
            NotificationTask::AssignRole { .. } => "assign_role",
            NotificationTask::JoinGuild { .. } => "join_guild",
        }
    }
}

// Access tokens stay out of logs.
impl fmt::Debug for NotificationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTask::SendLog(message) => f.debug_tuple("SendLog").field(message).finish(),
            NotificationTask::AssignRole { user_id } => f
                .debug_struct("AssignRole")
                .field("user_id", user_id)
                .finish(),
            NotificationTask::JoinGuild { user_id, .. } => f
                .debug_struct("JoinGuild")
                .field("user_id", user_id)
                .field("access_token", &"<redacted>")
                .finish(),
        }
    }
}
