use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use messenger_sync::event;
use messenger_sync::integration::{self, Config};
use messenger_sync::message::Message;
use messenger_sync::{AppState, Session};

#[tokio::main]
async fn main() {
    integration::init_logger();

    let cfg = Config::default();
    info!("starting messenger-sync in {:?} mode", cfg.env);

    let state = match AppState::init(&cfg) {
        Ok(state) => state,
        Err(e) => {
            error!("could not initialize: {e}");
            return;
        }
    };

    let session = match Session::sign_up(&state, "me", "password", "Me").await {
        Ok(session) => session,
        Err(e) => {
            error!("could not sign up: {e}");
            return;
        }
    };
    if let Some(advisory) = session.advisory() {
        warn!("{}", advisory.user_message());
    }

    let bot = match Session::sign_up(&state, "geminibot", "password", "Gemini").await {
        Ok(bot) => bot.viewer(),
        Err(e) => {
            error!("could not register bot: {e}");
            return;
        }
    };

    let conversation_id = match session.start_conversation(&bot).await {
        Ok(id) => id,
        Err(e) => {
            error!("could not start conversation: {}", e.user_message());
            return;
        }
    };

    let viewer = session.viewer().id;
    session
        .open(
            &conversation_id,
            event::listener(move |messages: Vec<Message>| {
                if let Some(last) = messages.last() {
                    let who = if last.sender == viewer { "me" } else { "bot" };
                    println!("[{who}] {}", last.text);
                }
            }),
        )
        .await;

    println!("chatting with {}, type a message and press enter", bot.name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                if let Err(e) = session.send(&line).await {
                    eprintln!("{}", e.user_message());
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("could not read stdin: {e}");
                break;
            }
        }
    }

    session.logout().await;
}
