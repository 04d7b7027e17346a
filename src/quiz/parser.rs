//! Best-effort parser for the markdown quizzes written by the AI tutor.
//!
//! The expected shape is
//!
//! ```text
//! **Question 1:** What is 2+2?
//! a) 3
//! b) 4
//! **Correct Answer:** b)
//! **Explanation:** Two plus two is four.
//! ```
//!
//! Nothing here ever fails: malformed blocks simply produce fewer options, a
//! missing answer, or no question at all.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::quiz::{AnswerOption, OptionKey, Question};

static QUESTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Question \d+:\*\*").expect("question marker regex"));

static CORRECT_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\*\*Correct Answer:\*\*\s*([a-d])\)").expect("correct answer regex")
});

static CORRECT_ANSWER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)\*\*Correct Answer:\*\*.*$").expect("answer line regex"));

static EXPLANATION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\*\*Explanation:\*\*[ \t]*(.*)$").expect("explanation line regex")
});

// Option markers have no left boundary, so `(by area)` in a prompt also opens
// an option. Kept that way to read quizzes exactly as the web client did.
static FIRST_OPTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-d]\)").expect("option marker regex"));

static OPTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-d])\)\s+").expect("option start regex"));

// An option ends where a new line opens with another option marker.
static OPTION_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\n[a-d]\)").expect("option end regex"));

/// Parses every question block of `text`, in order of appearance.
pub fn parse_markdown_quiz(text: &str) -> Vec<Question> {
    let questions: Vec<Question> = split_blocks(text)
        .into_iter()
        .filter_map(parse_block)
        .collect();

    log::debug!("Parsed {} question(s) from quiz text", questions.len());
    questions
}

fn split_blocks(text: &str) -> Vec<&str> {
    let mut segments = QUESTION_MARKER.split(text);
    if QUESTION_MARKER.is_match(text) {
        // Preamble before the first marker.
        segments.next();
    }

    segments
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn parse_block(block: &str) -> Option<Question> {
    let correct_key = CORRECT_ANSWER
        .captures(block)
        .and_then(|caps| caps[1].chars().next())
        .and_then(OptionKey::from_char);

    let explanation = EXPLANATION_LINE
        .captures(block)
        .map(|caps| caps[1].trim().to_string())
        .filter(|text| !text.is_empty());

    let body = CORRECT_ANSWER_LINE.replace_all(block, "");
    let body = EXPLANATION_LINE.replace_all(&body, "");
    let body = body.trim();

    let options = scan_options(body);
    if options.is_empty() {
        log::debug!("Dropping quiz block without options: {:?}", body);
        return None;
    }

    let prompt = match FIRST_OPTION_MARKER.find(body) {
        Some(marker) => &body[..marker.start()],
        None => body,
    };

    Some(Question::new(join_lines(prompt), options, correct_key).with_explanation(explanation))
}

fn scan_options(body: &str) -> Vec<AnswerOption> {
    let mut options = Vec::new();
    let mut position = 0;

    while let Some(caps) = OPTION_START.captures_at(body, position) {
        let (Some(marker), Some(letter)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let text_start = marker.end();
        let text_end = OPTION_END
            .find_at(body, text_start)
            .map_or(body.len(), |next| next.start());

        if let Some(key) = letter.as_str().chars().next().and_then(OptionKey::from_char) {
            options.push(AnswerOption::new(key, body[text_start..text_end].trim()));
        }
        position = text_end;
    }

    options
}

fn join_lines(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ").trim().to_string()
}
