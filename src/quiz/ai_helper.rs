use std::fmt;
use std::str::FromStr;

use chatgpt::client::ChatGPT;
use chatgpt::types::CompletionResponse;

use crate::error::QuizHelperError;
use crate::quiz::{OptionKey, Question};

/// Asks the AI tutor for quizzes and explanations.
pub struct QuizHelper {
    persona: TutorPersona,
    chat_gpt: ChatGPT,
}

impl QuizHelper {
    pub fn new(chat_gpt: ChatGPT, persona: TutorPersona) -> Self {
        Self { persona, chat_gpt }
    }

    /// Returns the raw markdown quiz; see [`crate::quiz::parser`] for the format.
    pub async fn generate_quiz(&self, topic: &str, count: usize) -> Result<String, QuizHelperError> {
        log::info!("Generating {} quiz question(s) about {:?}", count, topic);
        let prompt = quiz_prompt(topic, count, self.persona);
        self.complete(&prompt).await
    }

    pub async fn explain_wrong_answer(
        &self,
        question: &Question,
        chosen: OptionKey,
    ) -> Result<String, QuizHelperError> {
        log::debug!(
            "Generating explanation for wrong answer to {:?}",
            question.text
        );
        let correct = question
            .correct_option()
            .ok_or(QuizHelperError::NoCorrectAnswer)?;
        let wrong = question
            .option(chosen)
            .ok_or(QuizHelperError::UnknownOption(chosen))?;

        let prompt = format!(
            "You are a tutor helping a student learn.
        The student was asked: \"{}\"
        The student answered \"{}\", but the correct answer is \"{}\".
        Explain in one or two short paragraphs why the correct answer is right and where the student's reasoning went wrong.
        Write it as {}.",
            question.text,
            wrong.text,
            correct.text,
            self.persona.describe()
        );

        self.complete(&prompt).await
    }

    /// Free-form tutoring outside a quiz.
    pub async fn answer_question(
        &self,
        mode: TutorMode,
        question: &str,
    ) -> Result<String, QuizHelperError> {
        log::info!("Answering {:?} question {:?}", mode, question);
        let prompt = tutor_prompt(mode, question, self.persona);
        self.complete(&prompt).await
    }

    async fn complete(&self, prompt: &str) -> Result<String, QuizHelperError> {
        let response: CompletionResponse = self.chat_gpt.send_message(prompt).await?;
        let content = response.message().clone().content;

        log::debug!("Completion: {:?}", content);

        Ok(content)
    }
}

fn quiz_prompt(topic: &str, count: usize, persona: TutorPersona) -> String {
    format!(
        "You are a tutor writing a multiple-choice quiz about \"{topic}\" for a student.
Write exactly {count} questions, each with four options, in exactly this markdown format and nothing else:

**Question 1:** <question text>
a) <option>
b) <option>
c) <option>
d) <option>
**Correct Answer:** <letter>)
**Explanation:** <one sentence>

Number the questions 1 to {count}. Write the explanations as {}.",
        persona.describe()
    )
}

fn tutor_prompt(mode: TutorMode, question: &str, persona: TutorPersona) -> String {
    let style = match mode {
        TutorMode::Text => {
            "Answer in a few short paragraphs of plain text. Use simple words and one example."
        }
        TutorMode::Code => {
            "Answer with a short explanation followed by a code example in a fenced code block. \
Keep the code minimal and commented."
        }
    };
    format!(
        "You are {} tutoring a student.
The student asks: \"{question}\"
{style}",
        persona.describe()
    )
}

/// How the tutor should shape a free-form answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorMode {
    Text,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TutorPersona {
    #[default]
    Friendly,
    Socratic,
    Strict,
}

impl TutorPersona {
    pub fn describe(&self) -> &'static str {
        match self {
            TutorPersona::Friendly => "a warm, encouraging teacher",
            TutorPersona::Socratic => "a Socratic teacher who guides with questions",
            TutorPersona::Strict => "a strict, precise examiner",
        }
    }
}

impl FromStr for TutorPersona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" => Ok(TutorPersona::Friendly),
            "socratic" => Ok(TutorPersona::Socratic),
            "strict" => Ok(TutorPersona::Strict),
            other => Err(format!(
                "unknown persona '{other}', expected friendly, socratic or strict"
            )),
        }
    }
}

impl fmt::Display for TutorPersona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TutorPersona::Friendly => "friendly",
            TutorPersona::Socratic => "socratic",
            TutorPersona::Strict => "strict",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_asks_for_the_parsed_format() {
        let prompt = quiz_prompt("volcanoes", 3, TutorPersona::Strict);

        assert!(prompt.contains("\"volcanoes\""));
        assert!(prompt.contains("exactly 3 questions"));
        assert!(prompt.contains("**Question 1:**"));
        assert!(prompt.contains("**Correct Answer:**"));
        assert!(prompt.contains("**Explanation:**"));
        assert!(prompt.contains(TutorPersona::Strict.describe()));
    }

    #[test]
    fn tutor_prompt_follows_the_mode() {
        let text = tutor_prompt(TutorMode::Text, "Why is the sky blue?", TutorPersona::Friendly);
        let code = tutor_prompt(TutorMode::Code, "How do I reverse a list?", TutorPersona::Friendly);

        assert!(text.starts_with("You are a warm, encouraging teacher"));
        assert!(text.contains("\"Why is the sky blue?\""));
        assert!(!text.contains("code block"));
        assert!(code.contains("\"How do I reverse a list?\""));
        assert!(code.contains("fenced code block"));
    }

    #[test]
    fn persona_parsing() {
        assert_eq!("Socratic".parse::<TutorPersona>(), Ok(TutorPersona::Socratic));
        assert_eq!(" strict ".parse::<TutorPersona>(), Ok(TutorPersona::Strict));
        assert!("grumpy".parse::<TutorPersona>().is_err());
        assert_eq!(TutorPersona::default().to_string(), "friendly");
    }
}
