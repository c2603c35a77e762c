use serde_json::json;
use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::controller::{NEW_QUESTION_BUTTON, SCORE_BUTTON, SURRENDER_BUTTON};

/// `[New question, Surrender], [My score]`
pub const QUIZ_LAYOUT: [&[&str]; 2] = [&[NEW_QUESTION_BUTTON, SURRENDER_BUTTON], &[SCORE_BUTTON]];

pub(crate) fn quiz_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> = QUIZ_LAYOUT
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(*label)).collect())
        .collect();

    KeyboardMarkup::new(keyboard).resize_keyboard()
}

fn vk_button_color(label: &str) -> &'static str {
    match label {
        NEW_QUESTION_BUTTON => "primary",
        SURRENDER_BUTTON => "negative",
        _ => "secondary",
    }
}

/// Keyboard JSON as `messages.send` expects it.
pub(crate) fn vk_quiz_keyboard() -> String {
    let buttons: Vec<Vec<serde_json::Value>> = QUIZ_LAYOUT
        .iter()
        .map(|row| {
            row.iter()
                .map(|label| {
                    json!({
                        "action": { "type": "text", "label": label, "payload": "{}" },
                        "color": vk_button_color(label),
                    })
                })
                .collect()
        })
        .collect();

    json!({ "one_time": false, "buttons": buttons }).to_string()
}
