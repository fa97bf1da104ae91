//! Connectivity smoke check: verifies the configured bot token against the
//! Bot API and prints the bot's identity. Exits non-zero on failure.

use anyhow::Context;

use courier_server::telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let token =
        std::env::var("COURIER_BOT_TOKEN").context("COURIER_BOT_TOKEN is not set")?;

    println!("Testing bot connection...");

    let client = TelegramClient::new(&token);
    match client.get_me().await {
        Ok(me) => {
            println!("✅ Bot is working!");
            println!("🤖 Bot name: {}", me.first_name);
            println!("📝 Bot username: @{}", me.username.as_deref().unwrap_or("none"));
            println!("🆔 Bot ID: {}", me.id);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Error: {e}");
            std::process::exit(1);
        }
    }
}
