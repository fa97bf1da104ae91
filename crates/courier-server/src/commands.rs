//! Operator command parsing and all user-visible text rendering.
//!
//! Parsing is transport-agnostic: a command string comes in, an
//! `OperatorCommand` or guidance text comes out, and nothing here ever
//! touches state.

use courier_types::models::{RegistryStats, UserId, UserRecord};
use courier_types::outcome::BroadcastReport;

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    Start,
    Help,
    Users,
    Stats,
    Reply { target: UserId, text: String },
    Broadcast { text: String },
    Block(UserId),
    Unblock(UserId),
}

/// Malformed operator input. Rendered back to the operator as guidance,
/// never a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Usage(&'static str),
    InvalidUserId,
    Unknown(String),
}

impl CommandError {
    pub fn guidance(&self) -> String {
        match self {
            CommandError::Usage(usage) => (*usage).to_string(),
            CommandError::InvalidUserId => {
                "Invalid user ID. Please provide a valid number.".to_string()
            }
            CommandError::Unknown(cmd) => {
                format!("Unknown command {cmd}. Use /help to see available commands.")
            }
        }
    }
}

const REPLY_USAGE: &str = "Usage: /reply <user_id> <message>";
const BROADCAST_USAGE: &str = "Usage: /broadcast <message>";
const BLOCK_USAGE: &str = "Usage: /block <user_id>";
const UNBLOCK_USAGE: &str = "Usage: /unblock <user_id>";

impl OperatorCommand {
    /// Parse a slash command. The leading token may carry an `@botname`
    /// suffix, which group chats append.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut parts = text.trim().splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or("");
        let head = head.split('@').next().unwrap_or(head);
        let rest = parts.next().map(str::trim).unwrap_or("");

        match head {
            "/start" => Ok(OperatorCommand::Start),
            "/help" => Ok(OperatorCommand::Help),
            "/users" => Ok(OperatorCommand::Users),
            "/stats" => Ok(OperatorCommand::Stats),
            "/reply" => {
                let mut args = rest.splitn(2, char::is_whitespace);
                let id = args.next().filter(|s| !s.is_empty());
                let text = args.next().map(str::trim).filter(|s| !s.is_empty());
                let (Some(id), Some(text)) = (id, text) else {
                    return Err(CommandError::Usage(REPLY_USAGE));
                };
                let target = id.parse().map_err(|_| CommandError::InvalidUserId)?;
                Ok(OperatorCommand::Reply {
                    target,
                    text: text.to_string(),
                })
            }
            "/broadcast" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage(BROADCAST_USAGE));
                }
                Ok(OperatorCommand::Broadcast {
                    text: rest.to_string(),
                })
            }
            "/block" => parse_single_id(rest, BLOCK_USAGE).map(OperatorCommand::Block),
            "/unblock" => parse_single_id(rest, UNBLOCK_USAGE).map(OperatorCommand::Unblock),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_single_id(rest: &str, usage: &'static str) -> Result<UserId, CommandError> {
    if rest.is_empty() || rest.split_whitespace().count() != 1 {
        return Err(CommandError::Usage(usage));
    }
    rest.parse().map_err(|_| CommandError::InvalidUserId)
}

// -- Operator-facing text --

pub const ADMIN_PANEL: &str = "🛡️ Admin Panel\n\n\
    Available commands:\n\
    /users - View all users\n\
    /stats - View statistics\n\
    /help - Show help";

pub const ADMIN_HELP: &str = "🛡️ Admin Help\n\n\
    Commands:\n\
    /users - View all users\n\
    /stats - View statistics\n\
    /reply <user_id> <message> - Reply to a specific user\n\
    /broadcast <message> - Send message to all users\n\
    /block <user_id> - Block a user\n\
    /unblock <user_id> - Unblock a user";

pub const NO_USERS: &str = "No users found.";
pub const NO_USERS_TO_REPLY: &str = "No active users to reply to.";
pub const SELECT_PROMPT: &str = "Select a user to reply to:";
pub const TARGET_NOT_FOUND: &str = "User not found.";

pub fn render_user_list(users: &[UserRecord]) -> String {
    if users.is_empty() {
        return NO_USERS.to_string();
    }

    let mut out = String::from("👥 Active Users:\n\n");
    for user in users {
        out.push_str(&format!(
            "🆔 ID: {}\n\
             👤 Name: {}\n\
             📝 Username: @{}\n\
             📅 Joined: {}\n\
             💬 Messages: {}\n",
            user.id,
            user.name(),
            user.handle.as_deref().unwrap_or("No username"),
            user.joined_at.format("%Y-%m-%d"),
            user.messages.len(),
        ));
        out.push_str(&"─".repeat(30));
        out.push('\n');
    }
    out
}

pub fn render_stats(stats: &RegistryStats) -> String {
    format!(
        "📊 Statistics\n\n\
         👥 Total Users: {}\n\
         💬 Total Messages: {}\n\
         📈 Average Messages per User: {:.1}",
        stats.total_users, stats.total_messages, stats.average_messages,
    )
}

pub fn render_broadcast_report(report: &BroadcastReport) -> String {
    format!(
        "📢 Broadcast completed!\n\
         ✅ Successfully sent: {}\n\
         ❌ Failed: {}",
        report.delivered, report.failed,
    )
}

pub fn reply_sent(target: UserId) -> String {
    format!("✅ Reply sent to user {target}")
}

pub fn reply_failed(target: UserId, reason: &str) -> String {
    format!("❌ Failed to send message to user {target}: {reason}")
}

pub fn user_not_found(target: UserId) -> String {
    format!("❌ No user with ID {target}.")
}

pub fn user_blocked(target: UserId) -> String {
    format!("✅ User {target} has been blocked.")
}

pub fn user_unblocked(target: UserId) -> String {
    format!("✅ User {target} has been unblocked.")
}

pub fn selection_ack(user: &UserRecord) -> String {
    format!(
        "💬 Replying to: {} (@{})\n\
         🆔 ID: {}\n\n\
         Type your reply message now, or use /reply {} <message>",
        user.name(),
        user.handle.as_deref().unwrap_or("No username"),
        user.id,
        user.id,
    )
}

pub fn broadcast_envelope(text: &str) -> String {
    format!("📢 Announcement:\n\n{text}")
}

// -- Client-facing text --

pub const CLIENT_HELP: &str = "💬 Help\n\n\
    Simply send me any message and I'll forward it to our team.\n\
    We'll respond to you as soon as possible.\n\n\
    You can send text, photos, documents, or any other type of message.";

pub const BLOCKED_NOTICE: &str = "❌ You have been blocked from using this bot.";

pub const FORWARD_CONFIRMATION: &str =
    "✅ Your message has been sent to our team. We'll get back to you soon!";

pub const FORWARD_FAILURE_NOTICE: &str =
    "❌ Sorry, there was an error sending your message. Please try again later.";

pub fn client_welcome(name: &str) -> String {
    format!(
        "👋 Hello {name}!\n\n\
         Welcome to our service. You can send me any message and I'll forward it to our team.\n\
         We'll get back to you as soon as possible.\n\n\
         Just type your message below 👇"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(OperatorCommand::parse("/users"), Ok(OperatorCommand::Users));
        assert_eq!(OperatorCommand::parse("/stats"), Ok(OperatorCommand::Stats));
        assert_eq!(OperatorCommand::parse("/help"), Ok(OperatorCommand::Help));
        assert_eq!(
            OperatorCommand::parse("/users@courier_bot"),
            Ok(OperatorCommand::Users)
        );
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(
            OperatorCommand::parse("/reply 42 on our way"),
            Ok(OperatorCommand::Reply {
                target: 42,
                text: "on our way".to_string()
            })
        );

        assert_eq!(
            OperatorCommand::parse("/reply 42"),
            Err(CommandError::Usage(REPLY_USAGE))
        );
        assert_eq!(
            OperatorCommand::parse("/reply"),
            Err(CommandError::Usage(REPLY_USAGE))
        );
        assert_eq!(
            OperatorCommand::parse("/reply forty-two hello"),
            Err(CommandError::InvalidUserId)
        );
    }

    #[test]
    fn test_parse_broadcast() {
        assert_eq!(
            OperatorCommand::parse("/broadcast maintenance at noon"),
            Ok(OperatorCommand::Broadcast {
                text: "maintenance at noon".to_string()
            })
        );
        assert_eq!(
            OperatorCommand::parse("/broadcast"),
            Err(CommandError::Usage(BROADCAST_USAGE))
        );
    }

    #[test]
    fn test_parse_block_unblock() {
        assert_eq!(
            OperatorCommand::parse("/block 7"),
            Ok(OperatorCommand::Block(7))
        );
        assert_eq!(
            OperatorCommand::parse("/unblock 7"),
            Ok(OperatorCommand::Unblock(7))
        );
        assert_eq!(
            OperatorCommand::parse("/block"),
            Err(CommandError::Usage(BLOCK_USAGE))
        );
        assert_eq!(
            OperatorCommand::parse("/block 7 8"),
            Err(CommandError::Usage(BLOCK_USAGE))
        );
        assert_eq!(
            OperatorCommand::parse("/block seven"),
            Err(CommandError::InvalidUserId)
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = OperatorCommand::parse("/frobnicate now").unwrap_err();
        assert_eq!(err, CommandError::Unknown("/frobnicate".to_string()));
        assert!(err.guidance().contains("/help"));
    }

    #[test]
    fn test_render_stats_formats_average() {
        let text = render_stats(&RegistryStats {
            total_users: 3,
            total_messages: 6,
            average_messages: 2.0,
        });
        assert!(text.contains("Total Users: 3"));
        assert!(text.contains("Total Messages: 6"));
        assert!(text.contains("Average Messages per User: 2.0"));
    }

    #[test]
    fn test_render_user_list_empty_and_populated() {
        assert_eq!(render_user_list(&[]), NO_USERS);

        let user = UserRecord {
            id: 7,
            display_name: Some("Ada".to_string()),
            handle: None,
            joined_at: chrono::Utc::now(),
            is_active: true,
            messages: Vec::new(),
        };
        let text = render_user_list(&[user]);
        assert!(text.contains("🆔 ID: 7"));
        assert!(text.contains("👤 Name: Ada"));
        assert!(text.contains("@No username"));
        assert!(text.contains("💬 Messages: 0"));
    }
}
