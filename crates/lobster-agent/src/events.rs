use serde_json::Value;

/// Observable things that happen on the live channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The server accepted `BOT_AUTH`.
    LiveAuthenticated,
    LiveRejected { reason: String },
    ActionFailed {
        action: Option<String>,
        error: Option<String>,
    },
    /// Another avatar changed; the raw frame fields.
    AvatarUpdate(Value),
    Ledger(Value),
    /// The channel went away without a local `disconnect`.
    ChannelClosed { reason: Option<String> },
}
