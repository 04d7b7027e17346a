use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::quiz::session::{QuestionView, QuizSession, SessionEvent};
use crate::quiz::OptionKey;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Repeating callback. Returning `Break` stops the repetition.
pub type TickTask = Box<dyn FnMut() -> ControlFlow<()> + Send + 'static>;

pub type Listener = Arc<dyn Fn(SessionEvent) + Send + Sync + 'static>;

pub trait TimerHandle: Send {
    fn cancel(&mut self);
    fn is_active(&self) -> bool;
}

pub trait Scheduler {
    type Handle: TimerHandle;

    fn schedule_repeating(&self, period: Duration, task: TickTask) -> Self::Handle;
}

/// Runs timers as tokio tasks. Must be used from inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[derive(Debug)]
pub struct TokioTimer {
    task: JoinHandle<()>,
}

impl Scheduler for TokioScheduler {
    type Handle = TokioTimer;

    fn schedule_repeating(&self, period: Duration, mut task: TickTask) -> TokioTimer {
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if task().is_break() {
                    break;
                }
            }
        });
        TokioTimer { task }
    }
}

impl TimerHandle for TokioTimer {
    fn cancel(&mut self) {
        self.task.abort();
    }

    fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A [`QuizSession`] with its countdown attached.
///
/// The timer is armed on start and after every explicit [`advance`], and is
/// gone once the session completes or this value is dropped. Events caused by
/// the timer go to the listener; events caused by direct calls are returned.
///
/// [`advance`]: TimedSession::advance
pub struct TimedSession<S: Scheduler> {
    session: Arc<Mutex<QuizSession>>,
    scheduler: S,
    timer: Option<S::Handle>,
    listener: Listener,
}

impl<S: Scheduler> TimedSession<S> {
    pub fn start(
        session: QuizSession,
        scheduler: S,
        listener: impl Fn(SessionEvent) + Send + Sync + 'static,
    ) -> Self {
        let mut timed = Self {
            session: Arc::new(Mutex::new(session)),
            scheduler,
            timer: None,
            listener: Arc::new(listener),
        };
        timed.arm();
        timed
    }

    pub fn select_answer(&self, key: OptionKey) -> Option<SessionEvent> {
        self.session.lock().select_answer(key)
    }

    /// Answers with the option `choose` picks from the question on screen. The
    /// pick and the answer happen under one lock, so a tick cannot move the
    /// quiz on in between. `None` when nothing was picked or the question was
    /// already answered.
    pub fn answer_with(
        &self,
        choose: impl FnOnce(&QuestionView<'_>) -> Option<OptionKey>,
    ) -> Option<SessionEvent> {
        let mut session = self.session.lock();
        let key = session.current_question().and_then(|view| choose(&view))?;
        session.select_answer(key)
    }

    pub fn advance(&mut self) -> Option<SessionEvent> {
        let event = self.session.lock().advance();
        match event {
            Some(SessionEvent::Advanced { .. }) => self.arm(),
            Some(SessionEvent::Completed { .. }) => self.disarm(),
            _ => {}
        }
        event
    }

    pub fn with_session<R>(&self, f: impl FnOnce(&QuizSession) -> R) -> R {
        f(&self.session.lock())
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| timer.is_active())
    }

    fn arm(&mut self) {
        self.disarm();
        if self.session.lock().is_completed() {
            return;
        }

        let session = Arc::clone(&self.session);
        let listener = Arc::clone(&self.listener);
        let task: TickTask = Box::new(move || {
            let Some(event) = session.lock().tick() else {
                return ControlFlow::Break(());
            };
            listener(event);
            if matches!(event, SessionEvent::Completed { .. }) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        self.timer = Some(self.scheduler.schedule_repeating(TICK_PERIOD, task));
    }

    fn disarm(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl<S: Scheduler> Drop for TimedSession<S> {
    fn drop(&mut self) {
        self.disarm();
    }
}
