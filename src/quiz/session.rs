use std::collections::BTreeSet;
use std::fmt;

use crate::quiz::{AnswerOption, OptionKey, Question};

pub const DEFAULT_TIME_LIMIT: u32 = 30;

/// What an accepted transition did. Rejected transitions return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Answered { index: usize, correct: bool },
    Ticked { time_left: u32 },
    Advanced { index: usize, timed_out: bool },
    Completed { timed_out: bool },
}

impl SessionEvent {
    pub fn timed_out(&self) -> bool {
        matches!(
            self,
            SessionEvent::Advanced {
                timed_out: true,
                ..
            } | SessionEvent::Completed { timed_out: true }
        )
    }
}

/// One attempt at a list of questions, one question at a time with a countdown.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    current: usize,
    selected: Option<OptionKey>,
    answered: BTreeSet<usize>,
    score: usize,
    time_limit: u32,
    time_left: u32,
    completed: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, time_limit: u32) -> Self {
        let completed = questions.is_empty();
        Self {
            questions,
            current: 0,
            selected: None,
            answered: BTreeSet::new(),
            score: 0,
            time_limit,
            time_left: time_limit,
            completed,
        }
    }

    /// Records the answer to the current question. Only the first answer per
    /// question counts.
    pub fn select_answer(&mut self, key: OptionKey) -> Option<SessionEvent> {
        if self.completed || self.answered.contains(&self.current) {
            return None;
        }

        let correct = self.questions[self.current].is_correct(key);
        self.selected = Some(key);
        self.answered.insert(self.current);
        if correct {
            self.score += 1;
        }

        Some(SessionEvent::Answered {
            index: self.current,
            correct,
        })
    }

    pub fn advance(&mut self) -> Option<SessionEvent> {
        if self.completed {
            return None;
        }
        Some(self.move_on(false))
    }

    /// One second of the countdown. Running out of time moves on without
    /// marking the question answered.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        if self.completed {
            return None;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            log::debug!("Question {} timed out", self.current + 1);
            return Some(self.move_on(true));
        }

        Some(SessionEvent::Ticked {
            time_left: self.time_left,
        })
    }

    fn move_on(&mut self, timed_out: bool) -> SessionEvent {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selected = None;
            self.time_left = self.time_limit;
            SessionEvent::Advanced {
                index: self.current,
                timed_out,
            }
        } else {
            self.completed = true;
            SessionEvent::Completed { timed_out }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn selected(&self) -> Option<OptionKey> {
        self.selected
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.answered.contains(&index)
    }

    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    pub fn current_question(&self) -> Option<QuestionView<'_>> {
        if self.completed {
            return None;
        }

        let question = &self.questions[self.current];
        let feedback_visible = self.answered.contains(&self.current);
        let options = question
            .options
            .iter()
            .map(|option| {
                let mark = if !feedback_visible {
                    OptionMark::Plain
                } else if question.is_correct(option.key) {
                    OptionMark::Correct
                } else if self.selected == Some(option.key) {
                    OptionMark::Incorrect
                } else {
                    OptionMark::Plain
                };
                OptionView { option, mark }
            })
            .collect();

        Some(QuestionView {
            question,
            number: self.current + 1,
            total: self.questions.len(),
            options,
            feedback_visible,
            selected: self.selected,
            time_left: self.time_left,
            score: self.score,
        })
    }

    pub fn summary(&self) -> Option<Summary> {
        self.completed
            .then(|| Summary::new(self.score, self.questions.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Plain,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone)]
pub struct OptionView<'a> {
    pub option: &'a AnswerOption,
    pub mark: OptionMark,
}

/// Everything a renderer needs to draw the current question.
#[derive(Debug, Clone)]
pub struct QuestionView<'a> {
    pub question: &'a Question,
    /// 1-based.
    pub number: usize,
    pub total: usize,
    pub options: Vec<OptionView<'a>>,
    pub feedback_visible: bool,
    pub selected: Option<OptionKey>,
    pub time_left: u32,
    pub score: usize,
}

impl QuestionView<'_> {
    pub fn is_last(&self) -> bool {
        self.number == self.total
    }

    /// `None` until an answer was given.
    pub fn answered_correctly(&self) -> Option<bool> {
        if !self.feedback_visible {
            return None;
        }
        Some(self.selected.is_some_and(|key| self.question.is_correct(key)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Perfect,
    Great,
    Good,
    KeepStudying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub score: usize,
    pub total: usize,
    pub percentage: usize,
    pub verdict: Verdict,
}

impl Summary {
    pub fn new(score: usize, total: usize) -> Self {
        if total == 0 {
            return Self {
                score,
                total,
                percentage: 0,
                verdict: Verdict::KeepStudying,
            };
        }

        // Rounded half up.
        let percentage = (score * 200 + total) / (total * 2);
        let verdict = if score == total {
            Verdict::Perfect
        } else if score * 5 >= total * 4 {
            Verdict::Great
        } else if score * 5 >= total * 3 {
            Verdict::Good
        } else {
            Verdict::KeepStudying
        };

        Self {
            score,
            total,
            percentage,
            verdict,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.score, self.total, self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::parser::parse_markdown_quiz;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn question(correct_key: Option<OptionKey>) -> Question {
        Question::new(
            "Which one?".to_string(),
            vec![
                AnswerOption::new(OptionKey::A, "first"),
                AnswerOption::new(OptionKey::B, "second"),
                AnswerOption::new(OptionKey::C, "third"),
            ],
            correct_key,
        )
    }

    fn session(count: usize, time_limit: u32) -> QuizSession {
        QuizSession::new(vec![question(Some(OptionKey::A)); count], time_limit)
    }

    #[test]
    fn starts_on_first_question_with_full_timer() {
        let session = session(3, 30);

        assert_eq!(session.current_index(), 0);
        assert_eq!(session.score(), 0);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.time_left(), 30);
        assert!(!session.is_completed());
        assert!(session.summary().is_none());
    }

    #[test]
    fn empty_session_is_already_completed() {
        let mut session = QuizSession::new(Vec::new(), 30);

        assert!(session.is_completed());
        assert!(session.current_question().is_none());
        assert_eq!(session.tick(), None);
        assert_eq!(session.summary(), Some(Summary::new(0, 0)));
    }

    #[test]
    fn parsed_quiz_round_trip() {
        let questions = parse_markdown_quiz(
            "**Question 1:** What is 2+2?\na) 3\nb) 4\nc) 5\nd) 6\n**Correct Answer:** b)",
        );
        let mut session = QuizSession::new(questions, 30);

        assert_eq!(
            session.select_answer(OptionKey::B),
            Some(SessionEvent::Answered {
                index: 0,
                correct: true
            })
        );
        assert_eq!(session.score(), 1);
        assert_eq!(
            session.advance(),
            Some(SessionEvent::Completed { timed_out: false })
        );

        let summary = session.summary().expect("completed");
        assert_eq!((summary.score, summary.total), (1, 1));
        assert_eq!(summary.verdict, Verdict::Perfect);
    }

    #[test]
    fn wrong_answer_does_not_score() {
        let mut session = session(2, 30);

        assert_eq!(
            session.select_answer(OptionKey::C),
            Some(SessionEvent::Answered {
                index: 0,
                correct: false
            })
        );
        assert_eq!(session.score(), 0);
        assert!(session.is_answered(0));
    }

    #[test]
    fn second_answer_on_same_question_is_ignored() {
        let mut session = session(2, 30);

        session.select_answer(OptionKey::C);
        assert_eq!(session.select_answer(OptionKey::A), None);

        assert_eq!(session.score(), 0);
        assert_eq!(session.selected(), Some(OptionKey::C));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn missing_correct_key_never_scores() {
        let mut session = QuizSession::new(vec![question(None)], 30);

        for key in OptionKey::ALL {
            session.select_answer(key);
        }

        assert_eq!(session.score(), 0);
    }

    #[test]
    fn advance_resets_selection_and_timer() {
        let mut session = session(2, 30);
        session.tick();
        session.tick();
        session.select_answer(OptionKey::A);

        assert_eq!(
            session.advance(),
            Some(SessionEvent::Advanced {
                index: 1,
                timed_out: false
            })
        );
        assert_eq!(session.selected(), None);
        assert_eq!(session.time_left(), 30);
        assert_eq!(session.score(), 1);
        assert!(session.is_answered(0));
        assert!(!session.is_answered(1));
    }

    #[test]
    fn countdown_auto_advances_without_answering() {
        let mut session = session(2, 30);

        for expected in (1..30).rev() {
            assert_eq!(
                session.tick(),
                Some(SessionEvent::Ticked {
                    time_left: expected
                })
            );
        }
        assert_eq!(
            session.tick(),
            Some(SessionEvent::Advanced {
                index: 1,
                timed_out: true
            })
        );
        assert_eq!(session.score(), 0);
        assert_eq!(session.time_left(), 30);

        for _ in 0..29 {
            session.tick();
        }
        assert!(!session.is_completed());
        assert_eq!(
            session.tick(),
            Some(SessionEvent::Completed { timed_out: true })
        );
        assert_eq!(session.score(), 0);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.summary().map(|s| s.total), Some(2));
    }

    #[test]
    fn completed_session_ignores_everything() {
        let mut session = session(1, 5);
        session.advance();

        assert_eq!(session.select_answer(OptionKey::A), None);
        assert_eq!(session.advance(), None);
        assert_eq!(session.tick(), None);
        assert_eq!(session.score(), 0);
        assert_eq!(session.time_left(), 5);
    }

    #[test]
    fn feedback_marks_correct_and_wrong_choice() {
        let mut session = session(1, 30);

        let view = session.current_question().expect("in progress");
        assert!(!view.feedback_visible);
        assert!(view.options.iter().all(|o| o.mark == OptionMark::Plain));
        assert_eq!(view.answered_correctly(), None);

        session.select_answer(OptionKey::B);
        let view = session.current_question().expect("in progress");
        let marks: Vec<OptionMark> = view.options.iter().map(|o| o.mark).collect();

        assert!(view.feedback_visible);
        assert_eq!(
            marks,
            vec![OptionMark::Correct, OptionMark::Incorrect, OptionMark::Plain]
        );
        assert_eq!(view.answered_correctly(), Some(false));
        assert!(view.is_last());
    }

    #[test]
    fn view_reports_position_timer_and_score() {
        let mut session = session(3, 10);
        session.select_answer(OptionKey::A);
        session.advance();
        session.tick();

        let view = session.current_question().expect("in progress");

        assert_eq!((view.number, view.total), (2, 3));
        assert_eq!(view.time_left, 9);
        assert_eq!(view.score, 1);
        assert!(!view.is_last());
    }

    #[test]
    fn timed_out_flag() {
        assert!(SessionEvent::Completed { timed_out: true }.timed_out());
        assert!(!SessionEvent::Advanced {
            index: 1,
            timed_out: false
        }
        .timed_out());
        assert!(!SessionEvent::Ticked { time_left: 3 }.timed_out());
    }

    #[rstest]
    #[case(5, 5, 100, Verdict::Perfect)]
    #[case(4, 5, 80, Verdict::Great)]
    #[case(3, 5, 60, Verdict::Good)]
    #[case(2, 5, 40, Verdict::KeepStudying)]
    #[case(0, 3, 0, Verdict::KeepStudying)]
    #[case(2, 3, 67, Verdict::Good)]
    #[case(1, 8, 13, Verdict::KeepStudying)]
    #[case(7, 8, 88, Verdict::Great)]
    fn summary_percentage_and_verdict(
        #[case] score: usize,
        #[case] total: usize,
        #[case] percentage: usize,
        #[case] verdict: Verdict,
    ) {
        let summary = Summary::new(score, total);

        assert_eq!(summary.percentage, percentage);
        assert_eq!(summary.verdict, verdict);
    }

    #[test]
    fn summary_display() {
        assert_eq!(Summary::new(3, 4).to_string(), "3/4 (75%)");
    }
}
