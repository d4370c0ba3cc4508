//! Main Entrypoint for the Tutor CLI
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Wiring the completion transport and the file-backed session store
//!    into the tutor client, and restoring any persisted session.
//! 4. Running the interactive loop and rendering session events.

mod config;
mod repl;
mod store;

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tutor_core::{
    RequestOptions, SessionEvent, TutorClient, TutorError, lesson::LessonRecord,
    transport::OpenAIChatTransport,
};

use crate::config::Config;
use crate::repl::{HELP_TEXT, ReplCommand};
use crate::store::JsonFileStore;

#[derive(Parser, Debug)]
#[command(name = "tutor", about = "Interactive LLM-backed tutoring client", version)]
struct Cli {
    /// Generate a lesson for this topic immediately on startup.
    #[arg(short, long)]
    topic: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();
    info!("Configuration loaded. Initializing session...");

    let cli = Cli::parse();

    // --- 3. Wire Transport, Store, and Client ---
    let openai_config = OpenAIConfig::new().with_api_key(&config.openai_api_key);
    let transport = Arc::new(OpenAIChatTransport::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let store = Arc::new(JsonFileStore::new(&config.data_dir)?);

    let (event_tx, event_rx) = mpsc::channel(32);
    let client = TutorClient::new(
        transport,
        store,
        RequestOptions {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        },
    )
    .with_events(event_tx);
    tokio::spawn(render_events(event_rx));

    if let Some(record) = client.restore().await {
        println!("Restored session for \"{}\".", record.topic);
        print_lesson(&record);
    }
    if let Some(topic) = &cli.topic {
        run_command(&client, ReplCommand::Lesson(topic.clone())).await;
    }

    // --- 4. Interactive Loop ---
    println!("{HELP_TEXT}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match repl::parse(&line) {
            None => continue,
            Some(ReplCommand::Quit) => break,
            Some(command) => run_command(&client, command).await,
        }
    }
    info!("Session ended.");
    Ok(())
}

async fn run_command(client: &TutorClient, command: ReplCommand) {
    match command {
        ReplCommand::Lesson(topic) => {
            if let Err(e) = client.generate_lesson(&topic).await {
                report(e);
            }
        }
        ReplCommand::Chat(text) => {
            if let Err(e) = client.send_chat_message(&text).await {
                report(e);
            }
        }
        ReplCommand::Answer { number, option } => {
            let Some(index) = number.checked_sub(1) else {
                println!("Question numbers start at 1.");
                return;
            };
            if !client.select_answer(index, &option).await {
                println!(
                    "Answer not recorded: the quiz is already graded or question {number} doesn't exist."
                );
            }
        }
        ReplCommand::Submit => {
            if client.submit_quiz().await.is_none() {
                println!("There is no quiz to grade yet. Generate a lesson first.");
            }
        }
        ReplCommand::Reset => client.reset().await,
        ReplCommand::Help => println!("{HELP_TEXT}"),
        ReplCommand::Quit => {}
    }
}

/// Drains session events and renders them. `Speak` is where a real
/// speech synthesizer would be handed the literal assistant text.
async fn render_events(mut rx: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::LessonReady(record) => print_lesson(&record),
            SessionEvent::TurnAppended(turn) => println!("[{}] {}", turn.role, turn.content),
            SessionEvent::Speak(text) => println!("(speaking) {text}"),
            SessionEvent::SelectionRecorded { index, option } => {
                println!("Recorded \"{option}\" for question {}.", index + 1);
            }
            SessionEvent::QuizGraded { score, total } => {
                println!("Quiz graded: {score}/{total} correct.");
            }
            SessionEvent::SessionCleared => println!("Session cleared."),
        }
    }
}

fn print_lesson(record: &LessonRecord) {
    println!("\n=== {} ===\n", record.topic);
    println!("{}\n", record.lesson);
    for (i, item) in record.quiz.iter().enumerate() {
        println!("Q{}: {}", i + 1, item.question);
        for option in &item.options {
            println!("   - {option}");
        }
    }
    if !record.quiz.is_empty() {
        println!();
    }
    println!("Summary: {}\n", record.summary);
}

fn report(error: TutorError) {
    match &error {
        TutorError::Transport(source) => eprintln!("Request failed: {error} ({source})"),
        _ => eprintln!("{error}"),
    }
}
