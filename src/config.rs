use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::quiz::ai_helper::TutorPersona;
use crate::quiz::session::DEFAULT_TIME_LIMIT;

pub const MAX_QUESTION_COUNT: usize = 20;

/// Runtime settings, read from the environment (and `.env`).
///
/// `TELOXIDE_TOKEN` is read by teloxide itself and is not part of this struct.
#[derive(Debug, Clone)]
pub struct Config {
    pub chatgpt_api_key: String,
    pub chatgpt_timeout: Duration,
    pub database_path: String,
    pub time_limit: u32,
    pub question_count: usize,
    pub persona: TutorPersona,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let chatgpt_api_key = lookup("CHATGPT_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "CHATGPT_API_KEY",
            })?;

        let timeout_secs: u64 = parse_or(&lookup, "CHATGPT_TIMEOUT_SECS", 15)?;
        let time_limit: u32 = parse_or(&lookup, "QUIZ_TIME_LIMIT_SECS", DEFAULT_TIME_LIMIT)?;
        if time_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "QUIZ_TIME_LIMIT_SECS",
                value: time_limit.to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        let question_count: usize = parse_or(&lookup, "QUIZ_QUESTION_COUNT", 5)?;
        if !(1..=MAX_QUESTION_COUNT).contains(&question_count) {
            return Err(ConfigError::Invalid {
                key: "QUIZ_QUESTION_COUNT",
                value: question_count.to_string(),
                reason: format!("must be between 1 and {MAX_QUESTION_COUNT}"),
            });
        }

        Ok(Self {
            chatgpt_api_key,
            chatgpt_timeout: Duration::from_secs(timeout_secs),
            database_path: lookup("QUIZ_DB_PATH").unwrap_or_else(|| "db.sqlite".to_string()),
            time_limit,
            question_count,
            persona: parse_or(&lookup, "TUTOR_PERSONA", TutorPersona::default())?,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
        value,
    })
}
