pub mod ai_helper;
pub mod parser;
pub mod session;
pub mod timer;

use std::fmt;

/// Letter of a multiple-choice option. Always stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    /// Case-insensitive, so `'B'` and `'b'` are the same key.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'a' => Some(OptionKey::A),
            'b' => Some(OptionKey::B),
            'c' => Some(OptionKey::C),
            'd' => Some(OptionKey::D),
            _ => None,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        match self {
            OptionKey::A => 'a',
            OptionKey::B => 'b',
            OptionKey::C => 'c',
            OptionKey::D => 'd',
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub key: OptionKey,
    pub text: String,
}

impl AnswerOption {
    pub fn new(key: OptionKey, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub options: Vec<AnswerOption>,
    pub correct_key: Option<OptionKey>,
    pub explanation: Option<String>,
}

impl Question {
    pub fn new(text: String, options: Vec<AnswerOption>, correct_key: Option<OptionKey>) -> Self {
        Self {
            text,
            options,
            correct_key,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation;
        self
    }

    pub fn option(&self, key: OptionKey) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.key == key)
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.correct_key.and_then(|key| self.option(key))
    }

    /// A question without a recorded answer can never be answered correctly.
    pub fn is_correct(&self, key: OptionKey) -> bool {
        self.correct_key == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('a', Some(OptionKey::A))]
    #[case('B', Some(OptionKey::B))]
    #[case('d', Some(OptionKey::D))]
    #[case('e', None)]
    #[case(')', None)]
    fn option_key_from_char(#[case] input: char, #[case] expected: Option<OptionKey>) {
        assert_eq!(OptionKey::from_char(input), expected);
    }

    #[test]
    fn option_key_index_mapping() {
        for (i, key) in OptionKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
            assert_eq!(OptionKey::from_index(i), Some(*key));
        }
        assert_eq!(OptionKey::from_index(4), None);
        assert_eq!(OptionKey::C.to_string(), "c");
    }

    #[test]
    fn question_without_answer_is_never_correct() {
        let question = Question::new(
            "Pick one".to_string(),
            vec![AnswerOption::new(OptionKey::A, "x")],
            None,
        );
        assert!(!question.is_correct(OptionKey::A));
        assert!(question.correct_option().is_none());
    }
}
