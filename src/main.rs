use anyhow::Result;
use clap::{Parser, Subcommand};
use healthdb_assistant::{Assistant, AssistantConfig, ConversationHistory, Mode, Response};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthdb-assistant")]
#[command(about = "Ask questions about diagnosis records and HIS event logs in plain English")]
struct Args {
    /// Path to the SQLite database (overrides HEALTH_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Maximum translate/execute attempts per question (overrides MAX_SQL_ATTEMPTS)
    #[arg(long, global = true)]
    max_attempts: Option<u8>,

    /// Print responses as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate one question into SQL and print the result table
    Query {
        /// The question in natural language
        question: String,
    },
    /// Interactive session; history lives until the process exits
    Chat {
        /// Mode to start in (switch with `:mode query` / `:mode chatbot`)
        #[arg(long, value_enum, default_value_t = Mode::Chatbot)]
        mode: Mode,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AssistantConfig::from_env()?;
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_sql_attempts = max_attempts.max(1);
    }

    info!(
        "Healthcare data assistant starting (model: {}, database: {})",
        config.llm.settings.model,
        config.database_path.display()
    );
    let assistant = Assistant::from_config(&config)?;

    match assistant.store().missing_tables() {
        Ok(missing) if !missing.is_empty() => {
            warn!("⚠️  Database is missing tables: {}", missing.join(", "))
        }
        Err(e) => warn!("⚠️  Could not inspect database: {}", e),
        Ok(_) => {}
    }

    match args.command {
        Command::Query { question } => {
            let outcome = assistant.query(&question).await;
            print_response(&mut std::io::stdout(), &Response::Query(outcome), args.json)?;
        }
        Command::Chat { mode } => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_chat(&assistant, mode, args.json, stdin, &mut std::io::stdout(), &mut std::io::stderr()).await?
        }
    }

    Ok(())
}

async fn run_chat<R, O, E>(
    assistant: &Assistant,
    mut mode: Mode,
    json: bool,
    input: R,
    out: &mut O,
    prompt: &mut E,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    O: Write,
    E: Write,
{
    let mut history = ConversationHistory::new();
    let mut lines = input.lines();

    // Prompt and status lines go to `prompt` (stderr) so `out` carries only answers.
    writeln!(prompt, "Healthcare Data Assistant. Commands: :mode query|chatbot, :history, :reset, :quit")?;
    loop {
        write!(prompt, "[{:?}] > ", mode)?;
        prompt.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            ":quit" | ":exit" => break,
            ":reset" => {
                history.clear();
                writeln!(prompt, "History cleared.")?;
            }
            ":history" => {
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&history)?)?;
                } else {
                    for (i, turn) in history.turns().iter().enumerate() {
                        writeln!(out, "{}. [{:?}] {}\n   {}", i + 1, turn.status, turn.question, turn.answer)?;
                    }
                }
            }
            ":mode query" => mode = Mode::Query,
            ":mode chatbot" => mode = Mode::Chatbot,
            question => {
                let response = assistant.ask(question, mode, &mut history).await;
                print_response(out, &response, json)?;
            }
        }
    }

    Ok(())
}

fn print_response<O: Write>(out: &mut O, response: &Response, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(response)?)?;
    } else {
        writeln!(out, "{}", response)?;
    }
    Ok(())
}
