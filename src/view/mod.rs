pub mod export;
pub mod text;

use colored::Colorize;
use thiserror::Error;

use crate::api::Item;
use crate::tree::FlatEntry;
use text::{clean_html, format_timestamp};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// Bounds-safe 1-indexed window into a flattened comment list. A page
/// number past the last page (or zero) yields an empty slice; a zero page
/// size is a caller bug and is reported as an error rather than absorbed.
pub fn page<'e, 'i>(
    entries: &'e [FlatEntry<'i>],
    page_size: usize,
    page_number: usize,
) -> Result<&'e [FlatEntry<'i>], ViewError> {
    if page_size == 0 {
        return Err(ViewError::InvalidPageSize);
    }
    if page_number == 0 {
        return Ok(&[]);
    }
    let Some(start) = (page_number - 1).checked_mul(page_size) else {
        return Ok(&[]);
    };
    if start >= entries.len() {
        return Ok(&[]);
    }
    let end = start.saturating_add(page_size).min(entries.len());
    Ok(&entries[start..end])
}

/// Number of pages needed for `total` entries.
pub fn total_pages(total: usize, page_size: usize) -> Result<usize, ViewError> {
    if page_size == 0 {
        return Err(ViewError::InvalidPageSize);
    }
    Ok(total.div_ceil(page_size))
}

/// Header block for the monitored item: title, byline, points, URL, and the
/// cleaned self-text when present.
pub fn print_subject(item: &Item) {
    let title = item.title.as_deref().unwrap_or("(untitled)");
    println!();
    match item.kind.as_deref() {
        Some(kind) if kind != "story" => println!("=== {} [{kind}] ===", title.bold()),
        _ => println!("=== {} ===", title.bold()),
    }
    let author = item.by.as_deref().unwrap_or("unknown");
    println!(
        "By {} · {}",
        author.cyan(),
        format_timestamp(item.created_at()).dimmed()
    );
    if let Some(parent) = item.parent {
        println!("In reply to item {parent}");
    }
    if let Some(score) = item.score {
        println!("Points: {}", score.to_string().yellow());
    }
    if let Some(descendants) = item.descendants {
        println!("Comments: {descendants}");
    }
    if let Some(url) = item.url.as_deref() {
        println!("URL: {}", url.blue().underline());
    }
    if let Some(text) = item.text.as_deref() {
        println!("\n{}", clean_html(text));
    }
}

pub fn print_page_banner(page_number: usize, total_pages: usize, total_comments: usize, width: usize) {
    println!(
        "\nPage {page_number} of {total_pages} (Total comments: {total_comments})"
    );
    println!("{}", "=".repeat(width));
}

/// Print one page of comments with per-depth indentation.
pub fn print_page(entries: &[FlatEntry<'_>], width: usize) {
    if entries.is_empty() {
        println!("\nNo more comments to display.");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("{}", format_comment(entry, width));
        if i + 1 < entries.len() {
            println!();
        }
    }
}

/// Render a single comment as an indented frame with author and timestamp.
pub fn format_comment(entry: &FlatEntry<'_>, width: usize) -> String {
    let indent = "  ".repeat(entry.depth);
    let author = entry.item.by.as_deref().unwrap_or("anonymous");
    let header = format!(
        "{indent}┌─ {} · {}",
        author.cyan().bold(),
        format_timestamp(entry.item.created_at()).dimmed()
    );
    let body = clean_html(entry.item.text.as_deref().unwrap_or(""));
    let wrapped = wrap_indented(&body, &format!("{indent}│ "), width);
    let footer = format!("{indent}└{}", "─".repeat(30));
    format!("{header}\n{wrapped}\n{footer}")
}

fn wrap_indented(text: &str, prefix: &str, width: usize) -> String {
    let limit = width.saturating_sub(prefix.chars().count()).max(20);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(prefix.trim_end().to_string());
            continue;
        }
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > limit {
                lines.push(format!("{prefix}{line}"));
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(format!("{prefix}{line}"));
    }
    lines.join("\n")
}
