//! A terminal client that asks the agent about an app.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use app_insight::core::{Conversation, TurnEvent, TurnInput};
use app_insight::{Settings, build_agent};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let agent = match build_agent(&settings) {
        Ok(agent) => agent,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    println!(
        "Ask me anything about app {}. Press Ctrl-D to quit.",
        settings.app_id().bold()
    );

    // The whole conversation lives here and is handed to every turn.
    let mut history = Conversation::new();

    loop {
        print!("> ");
        flush_stdout();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let input = TurnInput::new(line).with_history(history.clone());
        let mut events = agent.stream_turn(input);
        let mut progress_bar: Option<ProgressBar> = None;
        let mut in_text = false;

        loop {
            // No spinner while text is streaming onto the current line.
            if !in_text {
                progress_bar
                    .get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(progress_style.clone());
                        progress_bar.set_message("🤔 Thinking...");
                        progress_bar
                    })
                    .inc(1);
            }

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = events.next() => {
                    let Some(event) = event else {
                        break;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
            }

            match event {
                TurnEvent::TextDelta { text } => {
                    if !in_text {
                        print!("{}🤖 ", BAR_CHAR.bright_cyan());
                        in_text = true;
                    }
                    print!("{}", text.bright_white());
                    flush_stdout();
                }
                TurnEvent::ToolStart { name, input } => {
                    if in_text {
                        println!();
                        in_text = false;
                    }
                    println!(
                        "{}🔧 {} {}",
                        BAR_CHAR.bright_yellow(),
                        name.bold(),
                        input.dimmed()
                    );
                }
                TurnEvent::Done {
                    reply,
                    history: new_history,
                } => {
                    if in_text {
                        println!();
                    } else {
                        // Only the fallback reply arrives without deltas.
                        println!(
                            "{}🤖 {}",
                            BAR_CHAR.bright_cyan(),
                            reply.bright_white()
                        );
                    }
                    history = new_history;
                    break;
                }
                TurnEvent::Error { message } => {
                    if in_text {
                        println!();
                    }
                    println!("{}❌ {}", BAR_CHAR.bright_red(), message.red());
                    break;
                }
            }
        }

        println!();
    }

    ExitCode::SUCCESS
}

fn flush_stdout() {
    if let Err(err) = std::io::stdout().flush() {
        warn!("error flushing stdout: {err}");
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
