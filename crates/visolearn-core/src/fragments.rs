//! HTML fragment rendering and remote-fragment parsing.
//!
//! The remote service answers the `update_*` endpoints with small HTML
//! fragments; fallback mode renders the same markup locally so the UI does
//! not care where a fragment came from. Rendering is pure and byte-stable
//! for identical input.

use crate::session::{progress_percent, ChecklistItem};
use regex::Regex;
use std::sync::OnceLock;

const CHECKLIST_ITEM_PATTERN: &str = r#"<div class="checklist-item ([^"]+)">\s*<span class="checkmark">([^<]+)</span>\s*<span>([^<]+)</span>\s*</div>"#;

fn checklist_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CHECKLIST_ITEM_PATTERN).expect("checklist pattern compiles"))
}

/// Checklist fragment: one row per detail, identified rows struck through.
pub fn checklist_html(items: &[ChecklistItem]) -> String {
    let mut html = String::from(
        r#"<div id="checklist-container" style="background-color: #000000; color: #ffffff; padding: 15px; border-radius: 8px;">"#,
    );
    html.push_str(
        r#"<style>.checklist-item {display: flex; align-items: center; margin-bottom: 10px; padding: 8px; border-radius: 5px; transition: background-color 0.3s;} "#,
    );
    html.push_str(r#".identified {background-color: #1e4620; text-decoration: line-through; color: #7fff7f;} "#);
    html.push_str(r#".not-identified {background-color: #222222; color: #ffffff;} "#);
    html.push_str(r#".checkmark {margin-right: 10px; font-size: 1.2em;}</style>"#);

    for item in items {
        let css_class = if item.identified { "identified" } else { "not-identified" };
        let checkmark = if item.identified { "✅" } else { "❌" };
        html.push_str(&format!(
            r#"<div class="checklist-item {css_class}"><span class="checkmark">{checkmark}</span><span>{}</span></div>"#,
            item.detail
        ));
    }

    html.push_str("</div>");
    html
}

/// Progress fragment: "n/m details (p%)" plus a width-scaled bar.
pub fn progress_html(items: &[ChecklistItem]) -> String {
    if items.is_empty() {
        return "No active session or no details to identify.".to_string();
    }
    let total = items.len();
    let identified = items.iter().filter(|item| item.identified).count();
    let pct = progress_percent(identified, total);
    format!(
        r#"<div id="progress-container"><p>Progress: {identified}/{total} details ({pct:.1}%)</p><div style="background-color: #222222; border-radius: 4px;"><div style="width: {pct:.0}%; background-color: #1e4620; height: 8px; border-radius: 4px;"></div></div></div>"#,
    )
}

/// Attempt counter fragment. The displayed count is capped at the limit; a
/// warning line appears once the limit is reached.
pub fn attempt_counter_html(count: u32, limit: u32) -> String {
    let display = count.min(limit);
    let mut html = format!(r#"<div id="attempt-counter"><p>Attempts: {display}/{limit}</p>"#);
    if limit > 0 && count >= limit {
        html.push_str("<p class=\"attempt-warning\">Maximum attempts reached. The next interaction will move to a new image.</p>");
    }
    html.push_str("</div>");
    html
}

/// Difficulty label fragment.
pub fn difficulty_html(label: &str) -> String {
    format!(r#"<div id="difficulty-label">Difficulty: {label}</div>"#)
}

/// Extract checklist items from a remote checklist HTML fragment.
/// Unparseable input yields an empty list, never an error.
pub fn extract_checklist(html: &str) -> Vec<ChecklistItem> {
    checklist_item_re()
        .captures_iter(html)
        .enumerate()
        .map(|(id, caps)| ChecklistItem {
            detail: caps[3].trim().to_string(),
            identified: caps[1].contains("identified") && !caps[1].contains("not-identified"),
            id,
        })
        .collect()
}
