use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local};

use super::format::{format_bytes, format_duration};
use super::{BackupType, Entry, Mail, RecipientKind, ReportSettings, Status};

const DEFAULT_LANGUAGE: &str = "en";

pub(super) fn compose(
    settings: &ReportSettings,
    language: Option<&str>,
    entries: &[Entry],
    timestamp: &DateTime<Local>,
) -> Mail {
    let sender = mailbox(&settings.sender.name, &settings.sender.address);
    let language = language.unwrap_or(DEFAULT_LANGUAGE).replace('_', "-");

    let mut headers = vec![
        ("From".to_string(), sender.clone()),
        ("Reply-To".to_string(), sender),
    ];

    for kind in [RecipientKind::To, RecipientKind::Cc, RecipientKind::Bcc] {
        let addresses = settings
            .recipients
            .iter()
            .filter(|recipient| recipient.kind == kind)
            .map(|recipient| mailbox(&recipient.name, &recipient.address))
            .collect::<Vec<_>>();
        if addresses.is_empty() {
            continue;
        }
        let header = match kind {
            RecipientKind::To => "To",
            RecipientKind::Cc => "Cc",
            RecipientKind::Bcc => "Bcc",
        };
        headers.push((header.to_string(), addresses.join(", ")));
    }

    headers.extend([
        ("Subject".to_string(), encode_header(&settings.subject)),
        ("Date".to_string(), timestamp.to_rfc2822()),
        ("MIME-Version".to_string(), "1.0".to_string()),
        ("Content-Type".to_string(), "text/html; charset=utf-8".to_string()),
        ("Content-Language".to_string(), language.clone()),
        ("X-Application".to_string(), "Backup".to_string()),
    ]);

    Mail {
        headers,
        body: body(&language, entries, timestamp),
    }
}

/// `Name <address>` or only the address if there is no name.
fn mailbox(name: &str, address: &str) -> String {
    if name.is_empty() {
        address.to_string()
    } else {
        format!("{} <{address}>", encode_header(name))
    }
}

/// Headers may only contain ASCII, everything else is encoded as described in RFC 1342.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn body(language: &str, entries: &[Entry], timestamp: &DateTime<Local>) -> String {
    let mut html = String::new();
    let error_occurred = entries.iter().any(|entry| entry.status == Status::Error);

    // writing into a String can't fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"{}\">\n<head><meta charset=\"utf-8\"><title>Backup</title></head>\n\
         <body style=\"font-family: sans-serif; color: #212121;\">\n",
        escape_html(language)
    );

    for kind in BackupType::ALL {
        let tasks: Vec<&Entry> = entries.iter().filter(|entry| entry.kind == kind).collect();
        if tasks.is_empty() {
            continue;
        }

        let _ = write!(
            html,
            "<h2>{} {}</h2>\n<table cellpadding=\"6\" style=\"border-collapse: collapse;\">\n\
             <tr><th>Status</th><th>Name</th><th>Message</th><th>Size</th><th>Duration</th></tr>\n",
            kind.emoji(),
            kind.heading()
        );

        for task in tasks {
            let mut message = escape_html(&task.message);
            if task.status == Status::Error {
                message.push_str(" *");
            }
            let _ = write!(
                html,
                "<tr><td style=\"background-color: {}; color: #FFFFFF;\">{}</td><td>{}</td><td>{message}</td><td>{}</td><td>{}</td></tr>\n",
                task.status.color(),
                task.status,
                escape_html(&task.name),
                task.file_size.map(format_bytes).unwrap_or_default(),
                task.duration.map(format_duration).unwrap_or_default(),
            );
        }

        html.push_str("</table>\n");
    }

    if error_occurred {
        html.push_str("<p>* Please check the log files for further information.</p>\n");
    }

    let _ = write!(
        html,
        "<p style=\"color: #757575;\">{}</p>\n</body>\n</html>\n",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    );

    html
}
