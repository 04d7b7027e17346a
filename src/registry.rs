use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use teloxide::types::ChatId;

use crate::quiz::timer::{Scheduler, TimedSession, TokioScheduler};

/// Live quizzes, at most one per chat. Kept in memory only: a restart drops them.
pub struct QuizRegistry<S: Scheduler = TokioScheduler> {
    quizzes: Arc<Mutex<HashMap<ChatId, TimedSession<S>>>>,
}

impl<S: Scheduler> Clone for QuizRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            quizzes: Arc::clone(&self.quizzes),
        }
    }
}

impl<S: Scheduler> Default for QuizRegistry<S> {
    fn default() -> Self {
        Self {
            quizzes: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<S: Scheduler> QuizRegistry<S> {
    /// Starts tracking `quiz`, stopping any quiz the chat already had.
    pub fn insert(&self, chat_id: ChatId, quiz: TimedSession<S>) {
        let previous = self.quizzes.lock().insert(chat_id, quiz);
        if previous.is_some() {
            log::info!("Replaced running quiz in chat {}", chat_id);
        }
    }

    pub fn remove(&self, chat_id: ChatId) -> Option<TimedSession<S>> {
        self.quizzes.lock().remove(&chat_id)
    }

    pub fn with_quiz<R>(
        &self,
        chat_id: ChatId,
        f: impl FnOnce(&mut TimedSession<S>) -> R,
    ) -> Option<R> {
        self.quizzes.lock().get_mut(&chat_id).map(f)
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.quizzes.lock().contains_key(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.quizzes.lock().len()
    }
}
