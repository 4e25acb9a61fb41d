//! Email fetch tool — on-demand inbox queries for the agent.
//!
//! Stateless: each call opens a fresh IMAP session over TLS, searches,
//! fetches, parses, and logs out. The mailbox is opened read-only
//! (`EXAMINE`) and bodies are fetched with `BODY.PEEK`, so messages are
//! never marked `\Seen`.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::MessageParser;

use crate::config::EmailConfig;
use crate::error::ToolError;
use crate::tools::Tool;

/// Fetch emails from the configured account.
pub struct EmailFetchTool {
    config: Option<EmailConfig>,
}

impl EmailFetchTool {
    pub fn new(config: Option<EmailConfig>) -> Self {
        Self { config }
    }
}

#[derive(Debug, serde::Deserialize)]
struct FetchParams {
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default = "default_hours")]
    hours: u32,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_mode() -> String {
    "unread".to_string()
}

fn default_hours() -> u32 {
    24
}

fn default_limit() -> usize {
    50
}

#[async_trait]
impl Tool for EmailFetchTool {
    fn name(&self) -> &str {
        "email_fetch"
    }

    fn description(&self) -> &str {
        "Fetch emails from the configured email account. Supports two modes: \
         'unread' fetches all unread/unseen emails, 'recent' fetches emails \
         from the last N hours. Does NOT mark emails as read."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "mode": {
                    "type": "string",
                    "enum": ["unread", "recent"],
                    "description": "Fetch mode: 'unread' for unseen emails, 'recent' for last N hours",
                },
                "hours": {
                    "type": "integer",
                    "description": "Hours to look back (for 'recent' mode, default 24)",
                    "minimum": 1,
                    "maximum": 720,
                },
                "limit": {
                    "type": "integer",
                    "description": "Max emails to fetch (default 50)",
                    "minimum": 1,
                    "maximum": 200,
                },
            },
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let params: FetchParams =
            serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters {
                name: "email_fetch".into(),
                reason: e.to_string(),
            })?;

        let Some(config) = self.config.clone() else {
            return Ok(not_configured());
        };
        if config.imap_host.is_empty() || config.password.is_empty() {
            return Ok(not_configured());
        }

        let hours = params.hours.clamp(1, 720);
        let criteria = match params.mode.as_str() {
            "unread" => SearchCriteria::Unseen,
            "recent" => SearchCriteria::Since(Utc::now() - chrono::Duration::hours(i64::from(hours))),
            other => {
                return Ok(format!(
                    "Error: Unknown mode '{other}'. Use 'unread' or 'recent'."
                ));
            }
        };
        let limit = params.limit.clamp(1, 200);

        let fetched =
            tokio::task::spawn_blocking(move || fetch_inbox(&config, &criteria, limit)).await;

        match fetched {
            Ok(Ok(messages)) => {
                if messages.is_empty() {
                    let label = match params.mode.as_str() {
                        "unread" => "unread".to_string(),
                        _ => format!("from the last {hours} hours"),
                    };
                    return Ok(format!("No {label} emails found."));
                }
                Ok(format_messages(&messages))
            }
            Ok(Err(e)) => Ok(format!("Error fetching emails: {e}")),
            Err(e) => Err(ToolError::ExecutionFailed {
                name: "email_fetch".into(),
                reason: format!("fetch task panicked: {e}"),
            }),
        }
    }
}

fn not_configured() -> String {
    "Error: Email not configured. Set EMAIL_IMAP_HOST and EMAIL_PASSWORD in the environment."
        .to_string()
}

// ── Fetching ────────────────────────────────────────────────────────

/// One fetched email, ready for display.
#[derive(Debug, Clone)]
struct FetchedEmail {
    sender: String,
    subject: String,
    date: String,
    body: String,
}

#[derive(Debug, Clone)]
enum SearchCriteria {
    Unseen,
    Since(DateTime<Utc>),
}

impl SearchCriteria {
    /// IMAP SEARCH argument.
    fn to_imap(&self) -> String {
        match self {
            Self::Unseen => "UNSEEN".to_string(),
            Self::Since(dt) => format!("SINCE {}", dt.format("%d-%b-%Y")),
        }
    }
}

/// Render the fetched emails the way the agent expects to read them.
fn format_messages(messages: &[FetchedEmail]) -> String {
    let mut lines = vec![format!("Found {} email(s):\n", messages.len())];
    for (i, msg) in messages.iter().enumerate() {
        lines.push(format!("--- Email {} ---", i + 1));
        lines.push(format!("From: {}", msg.sender));
        lines.push(format!("Subject: {}", msg.subject));
        lines.push(format!("Date: {}", msg.date));
        lines.push(format!("\n{}\n", msg.body));
    }
    lines.join("\n")
}

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;
type ImapError = Box<dyn std::error::Error + Send + Sync>;

/// Query the inbox over IMAP/TLS (blocking — run in spawn_blocking).
fn fetch_inbox(
    config: &EmailConfig,
    criteria: &SearchCriteria,
    limit: usize,
) -> Result<Vec<FetchedEmail>, ImapError> {
    let tcp = TcpStream::connect((&*config.imap_host, config.imap_port))?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name: rustls::pki_types::ServerName<'_> =
        rustls::pki_types::ServerName::try_from(config.imap_host.clone())?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)?;
    let mut tls = rustls::StreamOwned::new(conn, tcp);

    let _greeting = read_line(&mut tls)?;

    let login = send_cmd(
        &mut tls,
        "A1",
        &format!("LOGIN \"{}\" \"{}\"", config.username, config.password),
    )?;
    if !login.last().is_some_and(|l| l.contains("OK")) {
        return Err("IMAP login failed".into());
    }

    // EXAMINE opens the mailbox read-only, so nothing we do below can
    // change message flags.
    let _examine = send_cmd(&mut tls, "A2", "EXAMINE \"INBOX\"")?;

    let search = send_cmd(&mut tls, "A3", &format!("SEARCH {}", criteria.to_imap()))?;
    let mut ids: Vec<String> = Vec::new();
    for line in &search {
        if let Some(rest) = line.strip_prefix("* SEARCH") {
            ids.extend(rest.split_whitespace().map(str::to_string));
        }
    }

    // Newest messages carry the highest sequence numbers; keep those.
    if ids.len() > limit {
        ids.drain(..ids.len() - limit);
    }

    let mut results = Vec::new();
    let mut tag = 4_u32;
    for id in &ids {
        let fetch = send_cmd(&mut tls, &format!("A{tag}"), &format!("FETCH {id} BODY.PEEK[]"))?;
        tag += 1;

        let raw: String = fetch
            .iter()
            .skip(1)
            .take(fetch.len().saturating_sub(2))
            .cloned()
            .collect();

        if let Some(parsed) = MessageParser::default().parse(raw.as_bytes()) {
            results.push(FetchedEmail {
                sender: extract_sender(&parsed),
                subject: parsed.subject().unwrap_or("(no subject)").to_string(),
                date: parsed
                    .date()
                    .map(format_date)
                    .unwrap_or_else(|| "Unknown".to_string()),
                body: extract_text(&parsed),
            });
        }
    }

    let _ = send_cmd(&mut tls, &format!("A{tag}"), "LOGOUT");

    Ok(results)
}

fn read_line(tls: &mut TlsStream) -> Result<String, ImapError> {
    let mut buf = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match std::io::Read::read(tls, &mut byte) {
            Ok(0) => return Err("IMAP connection closed".into()),
            Ok(_) => {
                buf.push(byte[0]);
                if buf.ends_with(b"\r\n") {
                    return Ok(String::from_utf8_lossy(&buf).to_string());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn send_cmd(tls: &mut TlsStream, tag: &str, cmd: &str) -> Result<Vec<String>, ImapError> {
    use std::io::Write;

    let full = format!("{tag} {cmd}\r\n");
    tls.write_all(full.as_bytes())?;
    tls.flush()?;

    let mut lines = Vec::new();
    loop {
        let line = read_line(tls)?;
        let done = line.starts_with(tag);
        lines.push(line);
        if done {
            break;
        }
    }
    Ok(lines)
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn extract_sender(parsed: &mail_parser::Message) -> String {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".into())
}

fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    "(no readable content)".to_string()
}

/// Strip HTML tags from content (basic) and collapse whitespace.
fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_date(d: &mail_parser::DateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        d.year, d.month, d.day, d.hour, d.minute
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn configured_tool() -> EmailFetchTool {
        EmailFetchTool::new(Some(EmailConfig {
            imap_host: "imap.example.com".into(),
            imap_port: 993,
            username: "user".into(),
            password: "secret".into(),
        }))
    }

    #[test]
    fn tool_identity() {
        let tool = configured_tool();
        assert_eq!(tool.name(), "email_fetch");
        assert!(tool.description().contains("Does NOT mark emails as read"));
    }

    #[test]
    fn schema_enumerates_modes() {
        let schema = configured_tool().parameters_schema();
        assert_eq!(schema["properties"]["mode"]["enum"][0], "unread");
        assert_eq!(schema["properties"]["mode"]["enum"][1], "recent");
        assert_eq!(schema["properties"]["hours"]["maximum"], 720);
        assert_eq!(schema["properties"]["limit"]["maximum"], 200);
    }

    #[tokio::test]
    async fn unconfigured_account_reports_error_text() {
        let tool = EmailFetchTool::new(None);
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert!(result.starts_with("Error: Email not configured"));
    }

    #[tokio::test]
    async fn empty_password_counts_as_unconfigured() {
        let tool = EmailFetchTool::new(Some(EmailConfig {
            imap_host: "imap.example.com".into(),
            imap_port: 993,
            username: "user".into(),
            password: String::new(),
        }));
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert!(result.starts_with("Error: Email not configured"));
    }

    #[tokio::test]
    async fn unknown_mode_reports_error_text() {
        let tool = configured_tool();
        let result = tool
            .execute(serde_json::json!({"mode": "starred"}))
            .await
            .unwrap();
        assert_eq!(result, "Error: Unknown mode 'starred'. Use 'unread' or 'recent'.");
    }

    #[tokio::test]
    async fn mistyped_params_are_rejected() {
        let tool = configured_tool();
        let err = tool
            .execute(serde_json::json!({"mode": 5}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidParameters { name, .. } if name == "email_fetch"
        ));
    }

    #[test]
    fn search_criteria_unseen() {
        assert_eq!(SearchCriteria::Unseen.to_imap(), "UNSEEN");
    }

    #[test]
    fn search_criteria_since_uses_imap_date() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(SearchCriteria::Since(dt).to_imap(), "SINCE 02-Jan-2026");
    }

    #[test]
    fn format_messages_lists_each_email() {
        let messages = vec![
            FetchedEmail {
                sender: "alice@example.com".into(),
                subject: "Quick question".into(),
                date: "2026-08-07 09:15".into(),
                body: "Can we talk?".into(),
            },
            FetchedEmail {
                sender: "bob@example.com".into(),
                subject: "(no subject)".into(),
                date: "Unknown".into(),
                body: "(no readable content)".into(),
            },
        ];
        let text = format_messages(&messages);
        assert!(text.starts_with("Found 2 email(s):"));
        assert!(text.contains("--- Email 1 ---"));
        assert!(text.contains("From: alice@example.com"));
        assert!(text.contains("--- Email 2 ---"));
        assert!(text.contains("Subject: (no subject)"));
    }

    #[test]
    fn strip_html_removes_tags_and_collapses_whitespace() {
        assert_eq!(strip_html("<p>Hello  <b>there</b></p>"), "Hello there");
        assert_eq!(strip_html("plain"), "plain");
    }
}
