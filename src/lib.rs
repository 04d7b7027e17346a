//! Timed multiple-choice quizzes generated by an AI tutor and delivered over Telegram.
//!
//! [`quiz::parser`] turns the tutor's markdown into [`quiz::Question`]s,
//! [`quiz::session`] runs one attempt at them and [`quiz::timer`] drives its
//! countdown. The bot binary wires these to teloxide.

pub mod config;
pub mod error;
pub mod quiz;
pub mod registry;
pub mod render;
