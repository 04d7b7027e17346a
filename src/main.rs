use std::sync::Arc;

use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use dotenv::dotenv;
use quiz_tutor_bot::{
    config::Config,
    quiz::{
        ai_helper::{QuizHelper, TutorMode},
        parser::parse_markdown_quiz,
        session::{QuizSession, SessionEvent},
        timer::{TimedSession, TokioScheduler},
        OptionKey, Question,
    },
    registry::QuizRegistry,
    render,
};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardMarkup, KeyboardRemove, ParseMode},
};
use tokio::sync::mpsc;

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type DialogueStorage = Arc<ErasedStorage<State>>;

/// Where the chat is in the conversation. Live quiz state is kept in
/// [`QuizRegistry`]; only this position survives a restart.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveTopic,
    TakingQuiz {
        topic: String,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();

    if let Err(err) = run().await {
        log::error!("Bot stopped: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> HandlerResult {
    let config = Arc::new(Config::from_env()?);
    log::info!(
        "Starting quiz tutor bot ({}s per question, {} questions, {} tutor)",
        config.time_limit,
        config.question_count,
        config.persona
    );

    let bot = Bot::from_env();

    log::info!("Opening dialogue storage at {}", config.database_path);
    let storage: DialogueStorage = SqliteStorage::open(&config.database_path, Json)
        .await?
        .erase();

    let gpt = {
        let mut gpt = ChatGPT::new(config.chatgpt_api_key.clone())?;

        gpt.config.engine = ChatGPTEngine::Gpt35Turbo;
        gpt.config.timeout = config.chatgpt_timeout;

        gpt
    };
    let quiz_helper = Arc::new(QuizHelper::new(gpt, config.persona));
    let registry: QuizRegistry = QuizRegistry::default();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveTopic].endpoint(receive_topic))
            .branch(dptree::case![State::TakingQuiz { topic }].endpoint(taking_quiz)),
    )
    .dependencies(dptree::deps![storage, quiz_helper, registry, config])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const GREETING_TEXT: &str = "Hi! I'm your quiz tutor. Tell me a topic and I'll quiz you on it, \
one question at a time, against the clock.\n\n\
You can also just ask me things: /ask <question> for an explanation, \
/code <question> for an answer with a code example.";
const ASK_TOPIC_TEXT: &str = "What topic should the quiz be about?";

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    bot.send_message(msg.chat.id, ASK_TOPIC_TEXT).await?;

    dialogue.update(State::ReceiveTopic).await?;
    Ok(())
}

async fn receive_topic(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    quiz_helper: Arc<QuizHelper>,
    registry: QuizRegistry,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(topic) = msg.text().map(str::trim).filter(|t| !t.is_empty()) else {
        bot.send_message(msg.chat.id, "Please send the topic as text")
            .await?;
        return Ok(());
    };

    if let Some((mode, question)) = render::parse_tutor_request(topic) {
        return ask_tutor(&bot, &quiz_helper, msg.chat.id, mode, question).await;
    }

    // Nice to have; a failure here must not stop the quiz.
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let markdown = match quiz_helper.generate_quiz(topic, config.question_count).await {
        Ok(markdown) => markdown,
        Err(err) => {
            log::warn!("Quiz generation for {:?} failed: {}", topic, err);
            bot.send_message(
                msg.chat.id,
                "I couldn't put a quiz together right now. Please try again in a moment.",
            )
            .await?;
            return Ok(());
        }
    };

    let questions = parse_markdown_quiz(&markdown);
    if questions.is_empty() {
        log::warn!("No questions could be parsed for {:?}", topic);
        bot.send_message(
            msg.chat.id,
            "I couldn't read any questions out of that quiz. Try another topic?",
        )
        .await?;
        return Ok(());
    }

    let count = questions.len();
    let session = QuizSession::new(questions, config.time_limit);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let timed = TimedSession::start(session, TokioScheduler, move |event: SessionEvent| {
        if event.timed_out() {
            // The receiver is gone only once the quiz is over.
            let _ = events_tx.send(event);
        }
    });
    let first = timed.with_session(|s| s.current_question().map(|view| render::question_message(&view)));
    registry.insert(msg.chat.id, timed);
    log::info!(
        "Chat {} started a {}-question quiz on {:?} ({} running)",
        msg.chat.id,
        count,
        topic,
        registry.len()
    );

    spawn_timeout_forwarder(bot.clone(), dialogue.clone(), registry, events_rx);

    bot.send_message(
        msg.chat.id,
        format!("Here are {} questions about {}. Good luck!", count, topic),
    )
    .await?;
    if let Some((text, keyboard)) = first {
        bot.send_message(msg.chat.id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
    }

    dialogue
        .update(State::TakingQuiz {
            topic: topic.to_string(),
        })
        .await?;
    Ok(())
}

/// Free-form tutoring. The chat stays in `ReceiveTopic`, so the next plain
/// message is still read as a quiz topic.
async fn ask_tutor(
    bot: &Bot,
    quiz_helper: &QuizHelper,
    chat_id: ChatId,
    mode: TutorMode,
    question: &str,
) -> HandlerResult {
    if question.is_empty() {
        bot.send_message(chat_id, "Add your question after the command, e.g. /ask Why is the sky blue?")
            .await?;
        return Ok(());
    }

    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
    let reply = quiz_helper
        .answer_question(mode, question)
        .await
        .unwrap_or_else(|err| {
            log::warn!("Tutor reply to {:?} failed: {}", question, err);
            "I can't answer right now. Please try again in a moment.".to_string()
        });
    bot.send_message(chat_id, reply).await?;
    bot.send_message(chat_id, ASK_TOPIC_TEXT).await?;
    Ok(())
}

async fn taking_quiz(
    bot: Bot,
    dialogue: QuizDialogue,
    topic: String,
    msg: Message,
    quiz_helper: Arc<QuizHelper>,
    registry: QuizRegistry,
) -> HandlerResult {
    if !registry.contains(msg.chat.id) {
        log::debug!("Chat {} has no running quiz on {:?}", msg.chat.id, topic);
        bot.send_message(msg.chat.id, "That quiz is no longer running.")
            .reply_markup(KeyboardRemove::new())
            .await?;
        bot.send_message(msg.chat.id, ASK_TOPIC_TEXT).await?;
        dialogue.update(State::ReceiveTopic).await?;
        return Ok(());
    }

    match msg.text() {
        Some(render::EXIT_QUIZ) => {
            drop(registry.remove(msg.chat.id));
            bot.send_message(msg.chat.id, "Quiz closed.")
                .reply_markup(KeyboardRemove::new())
                .await?;
            bot.send_message(msg.chat.id, ASK_TOPIC_TEXT).await?;
            dialogue.update(State::ReceiveTopic).await?;
        }
        Some(render::NEXT_QUESTION) | Some(render::FINISH_QUIZ) => {
            advance_quiz(&bot, &dialogue, &registry).await?;
        }
        Some(text) => answer_question(&bot, &registry, &quiz_helper, msg.chat.id, text).await?,
        None => {
            bot.send_message(msg.chat.id, "Please pick one of the options")
                .await?;
        }
    }
    Ok(())
}

async fn answer_question(
    bot: &Bot,
    registry: &QuizRegistry,
    quiz_helper: &QuizHelper,
    chat_id: ChatId,
    text: &str,
) -> HandlerResult {
    enum Reply {
        Feedback {
            message: (String, KeyboardMarkup),
            wrong_pick: Option<(Question, OptionKey)>,
        },
        // Not an option of the question on screen, so show it again.
        Retry((String, KeyboardMarkup)),
    }

    let reply = registry
        .with_quiz(chat_id, |quiz| {
            let answered = quiz.answer_with(|view| render::resolve_answer(view, text));
            quiz.with_session(|session| {
                let view = session.current_question()?;
                match answered {
                    Some(_) => Some(Reply::Feedback {
                        message: render::feedback_message(&view),
                        wrong_pick: view
                            .selected
                            .filter(|_| view.answered_correctly() == Some(false))
                            .map(|key| (view.question.clone(), key)),
                    }),
                    None if !view.feedback_visible => {
                        Some(Reply::Retry(render::question_message(&view)))
                    }
                    // Already answered: a late or repeated tap.
                    None => None,
                }
            })
        })
        .flatten();

    match reply {
        Some(Reply::Feedback {
            message: (text, keyboard),
            wrong_pick,
        }) => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;

            if let Some((question, key)) = wrong_pick {
                if question.explanation.is_none() && question.correct_key.is_some() {
                    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
                    let reply = quiz_helper
                        .explain_wrong_answer(&question, key)
                        .await
                        .unwrap_or_else(|err| {
                            log::warn!("Could not generate an explanation: {}", err);
                            "Have another look at the correct answer and see why it fits best."
                                .to_string()
                        });
                    bot.send_message(chat_id, reply).await?;
                }
            }
        }
        Some(Reply::Retry((text, keyboard))) => {
            bot.send_message(chat_id, "Please pick one of the options")
                .await?;
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        None => {}
    }
    Ok(())
}

async fn advance_quiz(bot: &Bot, dialogue: &QuizDialogue, registry: &QuizRegistry) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    let next = registry.with_quiz(chat_id, |quiz| match quiz.advance() {
        Some(SessionEvent::Advanced { .. }) => quiz.with_session(|session| {
            session
                .current_question()
                .map(|view| render::question_message(&view))
        }),
        _ => None,
    });

    match next {
        Some(Some((text, keyboard))) => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        _ => finish_quiz(bot, dialogue, registry, None).await?,
    }
    Ok(())
}

/// Removes the chat's quiz, posts its summary and asks for the next topic.
/// Does nothing if the quiz was already finished elsewhere.
async fn finish_quiz(
    bot: &Bot,
    dialogue: &QuizDialogue,
    registry: &QuizRegistry,
    notice: Option<&str>,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    let Some(quiz) = registry.remove(chat_id) else {
        return Ok(());
    };
    let summary = quiz.with_session(QuizSession::summary);
    drop(quiz);

    if let Some(notice) = notice {
        bot.send_message(chat_id, notice).await?;
    }

    if let Some(summary) = summary {
        log::info!("Chat {} finished a quiz with {}", chat_id, summary);
        bot.send_message(chat_id, render::summary_message(&summary))
            .parse_mode(ParseMode::Html)
            .reply_markup(KeyboardRemove::new())
            .await?;
    }
    bot.send_message(chat_id, ASK_TOPIC_TEXT).await?;
    dialogue.update(State::ReceiveTopic).await?;
    Ok(())
}

/// Posts what the countdown did on its own: the next question after a
/// timeout, or the summary when the last question ran out.
fn spawn_timeout_forwarder(
    bot: Bot,
    dialogue: QuizDialogue,
    registry: QuizRegistry,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(err) = forward_timer_event(&bot, &dialogue, &registry, event).await {
                log::warn!("Failed to deliver timer event {:?}: {}", event, err);
            }
        }
        log::debug!("Timer events for chat {} closed", dialogue.chat_id());
    });
}

async fn forward_timer_event(
    bot: &Bot,
    dialogue: &QuizDialogue,
    registry: &QuizRegistry,
    event: SessionEvent,
) -> HandlerResult {
    let chat_id = dialogue.chat_id();
    match event {
        SessionEvent::Advanced { .. } => {
            let next = registry
                .with_quiz(chat_id, |quiz| {
                    quiz.with_session(|session| {
                        session
                            .current_question()
                            .map(|view| render::question_message(&view))
                    })
                })
                .flatten();
            if let Some((text, keyboard)) = next {
                bot.send_message(chat_id, render::timeout_notice()).await?;
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboard)
                    .await?;
            }
        }
        SessionEvent::Completed { .. } => {
            finish_quiz(bot, dialogue, registry, Some(render::timeout_notice())).await?;
        }
        SessionEvent::Answered { .. } | SessionEvent::Ticked { .. } => {}
    }
    Ok(())
}
