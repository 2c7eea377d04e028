//! RFC 822 parsing into [`EmailMetadata`].

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};
use uuid::Uuid;

use crate::capture::model::EmailMetadata;

/// Parse a raw message. Returns `None` when the bytes are not a message.
///
/// `fallback_received_at` is used when the message has no usable `Date`
/// header. Messages without a `Message-ID` get a generated one, and the
/// thread id falls back to the message id when there is no `In-Reply-To`.
pub fn parse_rfc822(raw: &[u8], fallback_received_at: DateTime<Utc>) -> Option<EmailMetadata> {
    let parsed = MessageParser::default().parse(raw)?;

    let message_id = parsed
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));
    let thread_id = parsed
        .in_reply_to()
        .as_text()
        .map(|s| s.to_string())
        .unwrap_or_else(|| message_id.clone());
    let received_at = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or(fallback_received_at);

    Some(EmailMetadata {
        message_id,
        thread_id,
        subject: parsed.subject().unwrap_or("(no subject)").to_string(),
        body: strip_quoted_text(&extract_text(&parsed)),
        sender: extract_sender(&parsed),
        received_at,
        is_unread: true,
        labels: Default::default(),
    })
}

/// `Name <addr>` when the sender has a display name, the bare address otherwise.
fn extract_sender(parsed: &mail_parser::Message) -> String {
    let Some(addr) = parsed.from().and_then(|a| a.first()) else {
        return "unknown".into();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) if !name.trim().is_empty() => {
            format!("{} <{address}>", name.trim())
        }
        (_, Some(address)) => address.to_string(),
        (Some(name), None) => name.trim().to_string(),
        (None, None) => "unknown".into(),
    }
}

/// Readable text of a message: plain body, then HTML body, then the first
/// text attachment.
fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    for part in parsed.attachments() {
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return text.to_string();
        }
    }
    String::new()
}

/// Strip HTML tags and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop quoted reply history so heuristics only see the new text.
///
/// Removes `>` lines and everything after an `On ... wrote:` attribution or
/// an `Original Message` separator.
pub fn strip_quoted_text(body: &str) -> String {
    let mut kept = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('>') {
            continue;
        }
        if (trimmed.starts_with("On ") && trimmed.ends_with("wrote:"))
            || (trimmed.starts_with("---") && trimmed.contains("Original Message"))
        {
            break;
        }
        kept.push(line);
    }
    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }
    kept.join("\n")
}
