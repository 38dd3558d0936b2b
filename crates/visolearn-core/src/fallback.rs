//! Local fallback: deterministic placeholder results for when the hosted
//! Space cannot be reached. Images, checklists, and chat responses are
//! synthesized without any network or image dependencies, and callers flag
//! them as degraded so the UI can say so.

use crate::session::{ChecklistItem, ImageData};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

const PLACEHOLDER_WIDTH: u32 = 512;
const PLACEHOLDER_HEIGHT: u32 = 512;
const MAX_CHECKLIST_ITEMS: usize = 8;

const GENERIC_DETAILS: [&str; 7] = [
    "Background color",
    "Main subject",
    "Foreground elements",
    "Lighting effects",
    "Shadows and highlights",
    "Texture patterns",
    "Color scheme",
];

/// Placeholder image as an inline SVG data URL. Carries the topic and a
/// visible banner so a degraded session is unmistakable on screen.
pub fn placeholder_image(topic: &str) -> ImageData {
    let title = if topic.trim().is_empty() {
        "Sample Image".to_string()
    } else {
        format!("Sample Image: {}", topic.trim())
    };
    let svg = format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##,
            r##"<rect width="{w}" height="{h}" fill="#f0f0f0"/>"##,
            r##"<rect x="10" y="10" width="{iw}" height="{ih}" fill="none" stroke="#b4b4b4" stroke-width="10"/>"##,
            r##"<text x="50%" y="50%" text-anchor="middle" fill="#646464" font-family="sans-serif" font-size="30">{title}</text>"##,
            r##"<text x="20" y="{banner_y}" fill="#ff0000" font-family="sans-serif" font-size="14">FALLBACK MODE - API Unavailable</text>"##,
            r##"</svg>"##
        ),
        w = PLACEHOLDER_WIDTH,
        h = PLACEHOLDER_HEIGHT,
        iw = PLACEHOLDER_WIDTH - 20,
        ih = PLACEHOLDER_HEIGHT - 20,
        banner_y = PLACEHOLDER_HEIGHT - 20,
        title = xml_escape(&title),
    );
    let size = svg.len() as u64;
    ImageData {
        url: format!("data:image/svg+xml;base64,{}", BASE64.encode(svg)),
        mime_type: Some("image/svg+xml".to_string()),
        size: Some(size),
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Topic-specific details for a handful of common topic families.
fn topic_details(topic: &str) -> &'static [&'static str] {
    let lower = topic.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));

    if has(&["animal", "animals", "pet", "pets", "wildlife"]) {
        &["Animal type", "Animal posture", "Animal coloring", "Habitat elements", "Animal features"]
    } else if has(&["person", "people", "child", "children", "family"]) {
        &["Person's expression", "Clothing items", "Posture or pose", "Hair style", "Action being performed"]
    } else if has(&["nature", "landscape", "tree", "forest", "mountain", "ocean"]) {
        &["Type of landscape", "Plant life", "Weather conditions", "Time of day", "Natural features"]
    } else if has(&["object", "toy", "item", "tool"]) {
        &["Object shape", "Object purpose", "Object material", "Object size", "Object color"]
    } else {
        &[]
    }
}

/// Placeholder checklist: topic-specific details first, generic details after,
/// capped. Deterministic for a given topic.
pub fn placeholder_checklist(topic: &str) -> Vec<ChecklistItem> {
    topic_details(topic)
        .iter()
        .chain(GENERIC_DETAILS.iter())
        .take(MAX_CHECKLIST_ITEMS)
        .enumerate()
        .map(|(id, detail)| ChecklistItem {
            detail: (*detail).to_string(),
            identified: false,
            id,
        })
        .collect()
}

/// Local chat round: word-match the message against unidentified details,
/// praise new finds or hint at a remaining one, and warn when the next
/// attempt reaches the limit.
pub fn respond(
    message: &str,
    checklist: &[ChecklistItem],
    attempt_count: u32,
    attempt_limit: u32,
) -> (String, Vec<ChecklistItem>) {
    let message_lower = message.to_lowercase();
    let mut updated = checklist.to_vec();

    for item in updated.iter_mut().filter(|item| !item.identified) {
        let matched = item
            .detail
            .to_lowercase()
            .split_whitespace()
            .any(|word| word.len() > 3 && message_lower.contains(word));
        if matched {
            item.identified = true;
        }
    }

    let newly_identified = updated
        .iter()
        .zip(checklist.iter())
        .filter(|(new, old)| new.identified && !old.identified)
        .count();

    let mut response = if newly_identified > 0 {
        let mut text = format!(
            "Great job! You identified {} new detail{}.",
            newly_identified,
            if newly_identified > 1 { "s" } else { "" }
        );
        if newly_identified > 1 {
            text.push_str(" Your observation skills are excellent!");
        }
        text
    } else if let Some(hint) = updated.iter().find(|item| !item.identified) {
        format!(
            "Good try! Can you tell me more about the {}?",
            hint.detail.to_lowercase()
        )
    } else {
        "Wonderful! You've identified all the details in this image.".to_string()
    };

    let all_identified = !updated.is_empty() && updated.iter().all(|item| item.identified);
    if attempt_limit > 0 && attempt_count + 1 >= attempt_limit && !all_identified {
        response.push_str("\n\nThis is your last attempt. After this, we'll move to a new image.");
    }

    (response, updated)
}
