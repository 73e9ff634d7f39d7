// `chat` command: interactive REPL with the recommender.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::warn;

use crate::api::llm::Recommender;
use crate::models::{Conversation, Role};
use crate::storage::Storage;
use crate::utils::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let http = reqwest::Client::builder().user_agent("ludens/0.1").build()?;
    let recommender = Recommender::new(http, config)?;
    let storage = Storage::new(config.data_dir.clone())?;

    if let Some(imported) = storage.migrate_legacy_conversation() {
        println!(
            "(imported your previous chat history as \"{}\")",
            imported.title
        );
    }

    let mut profile = storage.load_profile();
    let mut conversation = Conversation::default();

    if profile.games.is_empty() {
        println!("Your library is empty. Run `ludens sync` first for grounded recommendations.");
    }
    println!(
        "Chatting with Ludens. Type 'quit' to exit, '/help' for conversation commands.\n"
    );

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let message = input.trim();
        if message.is_empty() {
            continue;
        }

        match message {
            "quit" | "exit" => break,
            "clear" | "/new" => {
                conversation = Conversation::default();
                println!("Started a new conversation.\n");
                continue;
            }
            "/refresh" => {
                profile = storage.load_profile();
                println!("Reloaded library: {} games.\n", profile.games.len());
                continue;
            }
            "/status" => {
                println!(
                    "{} games, {} conversation messages.\n",
                    profile.games.len(),
                    conversation.messages.len()
                );
                continue;
            }
            "/list" => {
                let listed = storage.list_conversations();
                if listed.is_empty() {
                    println!("No saved conversations yet.\n");
                } else {
                    for (i, meta) in listed.iter().take(10).enumerate() {
                        println!("  {}. {} ({} messages)", i + 1, meta.title, meta.message_count);
                    }
                    println!();
                }
                continue;
            }
            "/delete" => {
                if storage.delete_conversation(&conversation.id) {
                    println!("Deleted \"{}\".", conversation.title);
                }
                conversation = Conversation::default();
                println!("Started a new conversation.\n");
                continue;
            }
            _ => {}
        }

        if let Some(arg) = message.strip_prefix("/resume ") {
            let listed = storage.list_conversations();
            let picked = arg
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| listed.get(i))
                .and_then(|meta| storage.get_conversation(&meta.id));
            match picked {
                Some(resumed) => {
                    println!("Resumed \"{}\" ({} messages).\n", resumed.title, resumed.messages.len());
                    conversation = resumed;
                }
                None => println!("No such conversation; use the numbers shown by /list.\n"),
            }
            continue;
        }
        if message == "/help" {
            println!("  /new       start a new conversation");
            println!("  /list      list saved conversations");
            println!("  /resume N  resume conversation number N from /list");
            println!("  /delete    delete the current conversation");
            println!("  /refresh   reload the synced library");
            println!("  /status    show library and conversation size");
            println!();
            continue;
        }

        let reply = match recommender.chat(message, &profile, &conversation.messages).await {
            Ok(reply) => reply,
            Err(e) => {
                eprintln!("(request failed: {e})\n");
                continue;
            }
        };

        conversation.add_message(Role::User, message);
        conversation.add_message(Role::Assistant, &reply);
        println!("\nludens> {reply}\n");

        if let Err(e) = storage.save_conversation(&mut conversation) {
            warn!("failed to save conversation: {e}");
        }

        // Name the conversation after the first full exchange.
        if conversation.has_default_title() && conversation.messages.len() >= 2 {
            if let Ok(title) = recommender.generate_title(&conversation.messages).await {
                match storage.rename_conversation(&conversation.id, &title) {
                    Ok(Some(renamed)) => conversation.title = renamed.title,
                    Ok(None) => conversation.title = title,
                    Err(e) => warn!("failed to save conversation title: {e}"),
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
