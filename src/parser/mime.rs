//! MIME decoding of a raw RFC 5322 message into a [`MailMessage`].

use chrono::{DateTime, FixedOffset};
use mail_parser::{Address, MessageParser, MimeHeaders};

use crate::error::{ClipperError, Result};
use crate::model::attachment::{Attachment, ContentRef};
use crate::model::mail::MailMessage;

/// Decode headers, plain-text body and attachment metadata.
///
/// Attachment content is not copied; each [`Attachment`] carries a handle
/// for [`extract_attachment`].
pub fn parse_message(raw: &[u8]) -> Result<MailMessage> {
    let bytes = strip_envelope(raw);

    let Some(msg) = MessageParser::default().parse(bytes) else {
        // Not MIME at all: keep whatever text follows the header block.
        return Ok(MailMessage {
            plain_body: fallback_body(bytes),
            ..MailMessage::default()
        });
    };

    let plain_body = msg
        .body_text(0)
        .map(|s| s.into_owned())
        .or_else(|| msg.body_html(0).map(|html| html_to_text(&html)))
        .unwrap_or_default();

    let attachments = msg
        .attachments()
        .enumerate()
        .map(|(idx, part)| {
            let file_name = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{}", idx + 1));
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());
            Attachment {
                file_name,
                content_type,
                size: part.contents().len() as u64,
                content: ContentRef(idx),
            }
        })
        .collect();

    Ok(MailMessage {
        from: msg.from().map(format_addresses).unwrap_or_default(),
        to: msg.to().map(format_addresses).unwrap_or_default(),
        cc: msg.cc().map(format_addresses).filter(|s| !s.is_empty()),
        bcc: msg.bcc().map(format_addresses).filter(|s| !s.is_empty()),
        date: msg.date().and_then(format_date),
        subject: msg.subject().unwrap_or_default().trim().to_string(),
        plain_body,
        attachments,
    })
}

/// Decoded bytes of the attachment behind `content`.
pub fn extract_attachment(raw: &[u8], content: ContentRef) -> Result<Vec<u8>> {
    let msg = MessageParser::default()
        .parse(strip_envelope(raw))
        .ok_or_else(|| ClipperError::MimeError("Failed to parse message".into()))?;

    msg.attachments()
        .nth(content.0)
        .map(|part| part.contents().to_vec())
        .ok_or_else(|| ClipperError::AttachmentNotFound(format!("#{}", content.0 + 1)))
}

/// `Name <addr>, addr, ...` for every mailbox, groups flattened.
fn format_addresses(address: &Address<'_>) -> String {
    let mailboxes: Vec<&mail_parser::Addr<'_>> = match address {
        Address::List(list) => list.iter().collect(),
        Address::Group(groups) => groups.iter().flat_map(|g| g.addresses.iter()).collect(),
    };

    mailboxes
        .into_iter()
        .filter_map(|a| {
            let name = a.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
            let addr = a.address.as_deref().map(str::trim).filter(|n| !n.is_empty());
            match (name, addr) {
                (Some(n), Some(a)) => Some(format!("{n} <{a}>")),
                (None, Some(a)) => Some(a.to_string()),
                (Some(n), None) => Some(n.to_string()),
                (None, None) => None,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// RFC 2822 style date in the sender's own offset.
fn format_date(date: &mail_parser::DateTime) -> Option<String> {
    let minutes = i32::from(date.tz_hour) * 60 + i32::from(date.tz_minute);
    let offset_secs = if date.tz_before_gmt { -minutes } else { minutes } * 60;
    let offset = FixedOffset::east_opt(offset_secs)?;
    let utc = DateTime::from_timestamp(date.to_timestamp(), 0)?;
    Some(
        utc.with_timezone(&offset)
            .format("%a, %d %b %Y %H:%M:%S %z")
            .to_string(),
    )
}

/// Drop a UTF-8 BOM and an mbox `From ` envelope line.
fn strip_envelope(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Text after the first blank line, decoded as UTF-8 or Windows-1252.
fn fallback_body(data: &[u8]) -> String {
    let start = data
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|p| p + 2)
        .or_else(|| data.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4))
        .unwrap_or(data.len());
    let body = &data[start..];
    match std::str::from_utf8(body) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(body).0.into_owned(),
    }
}

/// Reduce an HTML body to readable plain text: scripts and styles dropped,
/// block elements become line breaks, common entities decoded, runs of
/// blank lines collapsed to one.
pub fn html_to_text(html: &str) -> String {
    const BLOCKS: &[&str] = &[
        "br", "p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6", "table",
    ];

    let mut out = String::with_capacity(html.len());
    let lower = html.to_ascii_lowercase();
    let mut i = 0;

    while i < html.len() {
        let rest = &lower[i..];
        if !rest.starts_with('<') {
            let next = rest.find('<').map(|p| i + p).unwrap_or(html.len());
            out.push_str(&html[i..next]);
            i = next;
            continue;
        }

        // Skip <script>/<style> including their content.
        if let Some(skip) = ["script", "style"].iter().find_map(|tag| {
            rest.strip_prefix('<')
                .filter(|r| r.starts_with(tag))
                .and_then(|_| rest.find(&format!("</{tag}>")).map(|end| end + tag.len() + 3))
        }) {
            i += skip;
            continue;
        }

        let end = rest.find('>').map(|p| i + p + 1).unwrap_or(html.len());
        let name: String = lower[i + 1..end]
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if BLOCKS.contains(&name.as_str()) {
            out.push('\n');
        }
        i = end;
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    let mut text = String::with_capacity(decoded.len());
    let mut blank = false;
    for line in decoded.lines().map(str::trim) {
        if line.is_empty() {
            if !blank && !text.is_empty() {
                text.push('\n');
            }
            blank = true;
        } else {
            text.push_str(line);
            text.push('\n');
            blank = false;
        }
    }
    text.trim_end().to_string()
}
