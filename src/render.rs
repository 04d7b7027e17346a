//! Telegram presentation of quiz views: HTML text plus reply keyboards.

use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::html;

use crate::quiz::ai_helper::TutorMode;
use crate::quiz::session::{OptionMark, QuestionView, Summary, Verdict};
use crate::quiz::OptionKey;

pub const NEXT_QUESTION: &str = "Next question ➡️";
pub const FINISH_QUIZ: &str = "Finish quiz 🏁";
pub const EXIT_QUIZ: &str = "Exit quiz";
pub const ASK_COMMAND: &str = "/ask";
pub const CODE_COMMAND: &str = "/code";

pub fn question_message(view: &QuestionView) -> (String, KeyboardMarkup) {
    let mut text = format!(
        "<b>Question {} of {}</b>   ⏱ {}s   Score: {}/{}\n\n{}\n",
        view.number,
        view.total,
        view.time_left,
        view.score,
        view.total,
        html::escape(&view.question.text)
    );
    for option in &view.options {
        text.push_str(&format!(
            "\n<b>{})</b> {}",
            option.option.key,
            html::escape(&option.option.text)
        ));
    }

    let mut rows: Vec<Vec<KeyboardButton>> = view
        .options
        .iter()
        .map(|option| vec![KeyboardButton::new(option_label(option.option.key, &option.option.text))])
        .collect();
    rows.push(vec![KeyboardButton::new(EXIT_QUIZ)]);

    (text, KeyboardMarkup::new(rows))
}

/// Feedback after an answer. Only meaningful once the view shows feedback.
pub fn feedback_message(view: &QuestionView) -> (String, KeyboardMarkup) {
    let mut text = match view.answered_correctly() {
        Some(true) => "🎉 <b>Correct!</b> Well done!".to_string(),
        _ => match view.question.correct_option() {
            Some(correct) => format!(
                "❌ <b>Incorrect.</b> The correct answer is: <b>{}) {}</b>",
                correct.key,
                html::escape(&correct.text)
            ),
            None => "❌ <b>Incorrect.</b> This question has no recorded answer.".to_string(),
        },
    };

    for option in &view.options {
        let icon = match option.mark {
            OptionMark::Correct => "✓",
            OptionMark::Incorrect => "✗",
            OptionMark::Plain => continue,
        };
        text.push_str(&format!(
            "\n{} {}) {}",
            icon,
            option.option.key,
            html::escape(&option.option.text)
        ));
    }

    if let Some(explanation) = &view.question.explanation {
        text.push_str(&format!(
            "\n\n<b>Explanation:</b> {}",
            html::escape(explanation)
        ));
    }

    let next = if view.is_last() {
        FINISH_QUIZ
    } else {
        NEXT_QUESTION
    };
    let keyboard = KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(next)],
        vec![KeyboardButton::new(EXIT_QUIZ)],
    ]);

    (text, keyboard)
}

pub fn timeout_notice() -> &'static str {
    "⏰ Time's up! Moving on."
}

pub fn summary_message(summary: &Summary) -> String {
    let verdict = match summary.verdict {
        Verdict::Perfect => "Perfect! Excellent work! 🌟",
        Verdict::Great => "Great job! Well done! 👍",
        Verdict::Good => "Good effort! Keep practicing! 💪",
        Verdict::KeepStudying => "Keep studying! You'll improve! 📚",
    };
    format!(
        "<b>Quiz completed! 🎉</b>\nYour score: <b>{}</b>\n{}",
        summary, verdict
    )
}

/// Works out which option of the question on screen `text` picks: a pressed
/// option button (`"b) 4"`), a typed letter (`"B"`) or a typed 1-based
/// position (`"2"`). A button left over from an earlier question, or a letter
/// the question has no option for, picks nothing.
pub fn resolve_answer(view: &QuestionView, text: &str) -> Option<OptionKey> {
    let text = text.trim();
    if let Some(option) = view
        .options
        .iter()
        .find(|option| option_label(option.option.key, &option.option.text) == text)
    {
        return Some(option.option.key);
    }

    if let Ok(position) = text.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| view.options.get(index))
            .map(|option| option.option.key);
    }

    let mut chars = text.chars();
    let key = chars.next().and_then(OptionKey::from_char)?;
    match (chars.next(), chars.next()) {
        (None, _) | (Some(')'), None) => view.question.option(key).map(|option| option.key),
        _ => None,
    }
}

/// Splits `/ask <question>` or `/code <question>` into the tutor mode and the
/// question, which is empty when the command came alone.
pub fn parse_tutor_request(text: &str) -> Option<(TutorMode, &str)> {
    let text = text.trim();
    let (command, question) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text, ""));
    // Group chats append the bot name: `/ask@quiz_tutor_bot`.
    let command = command.split('@').next().unwrap_or(command);

    let mode = match command {
        ASK_COMMAND => TutorMode::Text,
        CODE_COMMAND => TutorMode::Code,
        _ => return None,
    };
    Some((mode, question.trim()))
}

fn option_label(key: OptionKey, text: &str) -> String {
    format!("{key}) {text}")
}
