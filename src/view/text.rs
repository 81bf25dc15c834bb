use chrono::{Local, TimeZone};

/// "Mar 17, 2023 at 10:30 AM", or a placeholder when the timestamp is
/// missing or unrepresentable.
pub fn format_timestamp(unix_time: i64) -> String {
    if unix_time <= 0 {
        return "unknown time".to_string();
    }
    Local
        .timestamp_opt(unix_time, 0)
        .single()
        .map(|dt| dt.format("%b %d, %Y at %I:%M %p").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

/// Best-effort conversion of the API's HTML comment bodies to plain text:
/// paragraph breaks, inline markers for emphasis and code, stripping of any
/// other tag, and decoding of the entities the API actually emits. Not a
/// general HTML converter.
pub fn clean_html(raw: &str) -> String {
    if raw.is_empty() {
        return "[no content]".to_string();
    }
    let text = raw
        .replace("<p>", "\n\n")
        .replace("</p>", "")
        .replace("<i>", "_")
        .replace("</i>", "_")
        .replace("<b>", "*")
        .replace("</b>", "*")
        .replace("<code>", "`")
        .replace("</code>", "`")
        .replace("<pre>", "\n```\n")
        .replace("</pre>", "\n```\n");
    let text = decode_entities(&strip_tags(&text));
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "[no content]".to_string()
    } else {
        trimmed.to_string()
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

// `&amp;` goes last so that double-escaped entities decode one level only.
fn decode_entities(text: &str) -> String {
    text.replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}
