//! Note body rendering: a Markdown header table, the plain-text message,
//! and one link line per uploaded attachment.

use unicode_width::UnicodeWidthStr;

use crate::model::mail::MailMessage;
use crate::model::note::ResourceLink;

/// Rendering options for [`BodyFormat::render`].
#[derive(Debug, Clone, Copy)]
pub struct BodyFormat {
    /// Render the Date row when the message has one.
    pub include_date: bool,
}

impl Default for BodyFormat {
    fn default() -> Self {
        Self { include_date: true }
    }
}

/// One header row: label, value, and whether an absent value drops the row.
struct Row<'a> {
    label: &'static str,
    value: Option<&'a str>,
    optional: bool,
}

impl BodyFormat {
    /// Render the note body for `message`, followed by `links` if any.
    pub fn render(&self, message: &MailMessage, links: &[ResourceLink]) -> String {
        let date = if self.include_date {
            message.date.as_deref()
        } else {
            None
        };
        let rows = [
            Row { label: "From", value: Some(message.from.as_str()), optional: false },
            Row { label: "Subject", value: Some(message.subject.as_str()), optional: false },
            Row { label: "To", value: Some(message.to.as_str()), optional: false },
            Row { label: "Cc", value: message.cc.as_deref(), optional: true },
            Row { label: "Bcc", value: message.bcc.as_deref(), optional: true },
            Row { label: "Date", value: date, optional: true },
        ];

        let cells: Vec<(&str, String)> = rows
            .iter()
            .filter_map(|row| {
                let value = row.value.map(cell_text).unwrap_or_default();
                if row.optional && value.is_empty() {
                    None
                } else {
                    Some((row.label, value))
                }
            })
            .collect();

        // Widths only count rows that carry a value.
        let (max_label, max_value) = cells
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .fold((0, 0), |(l, v), (label, value)| {
                (l.max(label.width()), v.max(value.width()))
            });

        // "**" + label + ":**"
        let label_col = max_label + 5;
        let mut body = String::new();
        body.push_str(&format!(
            "| {} | {} |\n",
            " ".repeat(label_col),
            " ".repeat(max_value)
        ));
        body.push_str(&format!(
            "| {} | {} |\n",
            "-".repeat(label_col),
            "-".repeat(max_value)
        ));
        for (label, value) in &cells {
            body.push_str(&format!(
                "| **{label}:**{} | {value}{} |\n",
                " ".repeat(max_label.saturating_sub(label.width())),
                " ".repeat(max_value.saturating_sub(value.width())),
            ));
        }

        body.push('\n');
        body.push_str(&message.plain_body);

        append_links(&mut body, links);
        body
    }
}

/// Render with default options. See [`BodyFormat::render`].
pub fn format_body(message: &MailMessage, links: &[ResourceLink]) -> String {
    BodyFormat::default().render(message, links)
}

/// Append one link line per resource, separated from the text by a blank line.
pub fn append_links(body: &mut String, links: &[ResourceLink]) {
    if links.is_empty() {
        return;
    }
    let kept = body.trim_end_matches(['\n', '\r']).len();
    body.truncate(kept);
    body.push_str("\n\n");
    for link in links {
        body.push_str(&link.to_string());
        body.push('\n');
    }
}

/// Keep a header value on one table line.
fn cell_text(value: &str) -> String {
    value
        .trim()
        .replace(['\r', '\n'], " ")
        .replace('|', "\\|")
}
