//! An interactive terminal chat with the agent.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use parley::core::StructuredMessage;
use parley::{CliConfig, Session, SessionBuilder};
use parley_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::signal::ctrl_c;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!("configuration: {config:?}");

    let mut openai_config =
        OpenAIConfigBuilder::new().with_base_url(&config.base_url);
    if let Some(timeout) = config.timeout {
        openai_config = openai_config.with_timeout(timeout);
    }
    let openai_config = openai_config.build();
    let model_provider = match OpenAIProvider::new(openai_config) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("cannot create the model provider: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (step_tx, mut step_rx) = mpsc::unbounded_channel();

    let mut builder = SessionBuilder::with_model_provider(model_provider)
        .with_model(&config.model)
        .with_protocol(config.protocol)
        .on_step(move |message| {
            step_tx.send(message.clone()).ok();
        });
    if let Some(max_turns) = config.max_turns {
        builder = builder.with_max_turns(max_turns);
    }
    if let Some(temperature) = config.temperature {
        builder = builder.with_temperature(temperature);
    }
    let mut session = builder.build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = select! {
            line = read_line() => line,
            _ = ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut progress_bar: Option<ProgressBar> = None;
        let mut reply = pin!(session.send_message(line));

        let result = loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);

            select! {
                result = &mut reply => break Some(result),
                Some(message) = step_rx.recv() => {
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    print_step(&message);
                }
                _ = ctrl_c() => break None,
                _ = sleep(Duration::from_millis(100)) => {}
            }
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        // Steps reported right before the answer.
        while let Ok(message) = step_rx.try_recv() {
            print_step(&message);
        }

        match result {
            Some(Ok(message)) => print_answer(&message),
            Some(Err(err)) => {
                error!("conversation failed: {err}");
                println!("{}❌ {err}", BAR_CHAR.bright_red());
            }
            None => break,
        }
        println!();
    }

    save_session(&session, &config).await;
    ExitCode::SUCCESS
}

fn print_step(message: &StructuredMessage) {
    let Some(tool) = message.tool() else {
        return;
    };
    if let Some(thoughts) = message.thoughts() {
        println!("{}💭 {}", BAR_CHAR.bright_cyan(), thoughts.dimmed());
    }
    let args = serde_json::to_string(message.tool_args()).unwrap_or_default();
    println!(
        "{}🔧 {}",
        BAR_CHAR.bright_yellow(),
        format!("{tool}({args})").bright_white().bold()
    );
}

fn print_answer(message: &StructuredMessage) {
    match message.response() {
        Some(response) => {
            println!("{}🤖 {}", BAR_CHAR.bright_green(), response.green());
        }
        None => {
            let tool = message.tool().unwrap_or_default();
            println!(
                "{}⚠️  The model asked for an unknown tool: {}",
                BAR_CHAR.bright_yellow(),
                tool.bold()
            );
        }
    }
}

async fn save_session(session: &Session, config: &CliConfig) {
    if let Some(path) = &config.history_file {
        if let Err(err) = tokio::fs::write(path, session.history_json()).await {
            error!("error writing history to {}: {err}", path.display());
        }
    }
    if let Some(path) = &config.prompt_file {
        if let Err(err) = tokio::fs::write(path, session.system_prompt()).await
        {
            error!("error writing prompt to {}: {err}", path.display());
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
