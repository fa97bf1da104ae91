use std::path::PathBuf;

use anyhow::Context;

use courier_types::models::UserId;

/// Runtime configuration, read once at startup from the environment
/// (`.env` is loaded first if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub operator_id: UserId,
    pub store_path: PathBuf,
    pub poll_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_token =
            std::env::var("COURIER_BOT_TOKEN").context("COURIER_BOT_TOKEN is not set")?;

        let operator_id = std::env::var("COURIER_OPERATOR_ID")
            .context("COURIER_OPERATOR_ID is not set")?
            .parse()
            .context("COURIER_OPERATOR_ID must be a numeric user id")?;

        let store_path = std::env::var("COURIER_STORE_PATH")
            .unwrap_or_else(|_| "courier.json".into())
            .into();

        let poll_timeout_secs = std::env::var("COURIER_POLL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .context("COURIER_POLL_TIMEOUT_SECS must be a number of seconds")?;

        Ok(Self {
            bot_token,
            operator_id,
            store_path,
            poll_timeout_secs,
        })
    }
}
