use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdfrag::{
    answer::AnswerEngine,
    api::{self, ServerState},
    config::Config,
    documents::DocumentLister,
    indexing::IndexManager,
    logging,
    openai::{OpenAiClient, RetrievalBackend},
    session::{AVAILABLE_MODELS, AskOutcome, Assistant, ChatSession, Role, preset_question},
    state::StateStore,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "pdf-rag",
    version,
    about = "Index a folder of PDFs and ask questions answered only from their contents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the index id, the documents found, and what was last indexed.
    Status,
    /// Upload the PDFs in the data directory unless they are already indexed.
    Index,
    /// Ask a single question.
    Ask {
        /// Question text; ignored when `--preset` is given.
        question: Option<String>,
        /// Model used to answer.
        #[arg(long)]
        model: Option<String>,
        /// Use one of the preset questions (1-4).
        #[arg(long)]
        preset: Option<usize>,
    },
    /// Interactive question loop.
    Chat,
    /// Serve the HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = Config::load().context("failed to load configuration")?;
    let mut assistant = start_assistant(&config).await?;

    match cli.command {
        Command::Status => print_status(&assistant),
        Command::Index => {
            let outcome = assistant.index().await;
            println!("{}", outcome.message());
        }
        Command::Ask {
            question,
            model,
            preset,
        } => {
            if let Some(model) = model.as_deref() {
                select_model(&mut assistant, model)?;
            }
            let question = match preset {
                Some(position) => preset_question(position)
                    .with_context(|| format!("no preset question {position}"))?
                    .to_string(),
                None => question.unwrap_or_default(),
            };
            let mut session = ChatSession::new();
            match assistant.ask(&mut session, &question).await {
                AskOutcome::Answered(answer) => println!("{answer}"),
                AskOutcome::Rejected(message) | AskOutcome::Failed(message) => bail!(message),
            }
        }
        Command::Chat => run_chat(&mut assistant).await?,
        Command::Serve => serve(&config, assistant).await?,
    }

    Ok(())
}

async fn start_assistant(config: &Config) -> Result<Assistant> {
    let backend: Arc<dyn RetrievalBackend> =
        Arc::new(OpenAiClient::new(config).context("failed to build API client")?);
    let store = StateStore::new(&config.state_path);
    Ok(Assistant::start(
        store.clone(),
        DocumentLister::new(&config.data_dir),
        IndexManager::new(backend.clone(), store, &config.vector_store_name),
        AnswerEngine::new(backend),
        &config.default_model,
    )
    .await)
}

fn select_model(assistant: &mut Assistant, model: &str) -> Result<()> {
    if !assistant.select_model(model) {
        bail!(
            "unknown model {model}; choose one of {}",
            AVAILABLE_MODELS.join(", ")
        );
    }
    Ok(())
}

fn print_status(assistant: &Assistant) {
    let status = assistant.status();
    match &status.index_id {
        Some(index_id) => println!("Vector store: {index_id}"),
        None => println!("Vector store: not created yet (retried on the next action)"),
    }
    println!("State file:   {}", assistant.state_path().display());
    if status.documents.is_empty() {
        println!("No PDFs found in the data directory.");
    } else {
        println!("PDFs found:");
        for name in &status.documents {
            println!("  • {name}");
        }
    }
    if status.already_indexed {
        println!("These PDFs are already indexed.");
    } else if status.indexed_files.is_empty() {
        println!("Nothing indexed yet. Run `pdf-rag index`.");
    } else {
        println!("Indexed: {}", status.indexed_files.join(", "));
    }
    if let Some(when) = &status.last_indexed {
        println!("Last indexed: {when} UTC");
    }
    println!("Model: {}", status.model);
}

const CHAT_HELP: &str = "Commands: /index, /status, /model <name>, /preset <1-4>, /history, /clear, /quit";

async fn run_chat(assistant: &mut Assistant) -> Result<()> {
    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_status(assistant);
    println!("{CHAT_HELP}");

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{CHAT_HELP}"),
            "/status" => print_status(assistant),
            "/index" => println!("{}", assistant.index().await.message()),
            "/clear" => {
                session.clear();
                println!("Chat cleared.");
            }
            "/history" => {
                for turn in session.turns_newest_first() {
                    let speaker = match turn.role {
                        Role::User => "You",
                        Role::Assistant => "Assistant",
                    };
                    println!("{speaker}: {}\n---", turn.text);
                }
            }
            "/model" => match select_model(assistant, argument) {
                Ok(()) => println!("Model: {}", assistant.model()),
                Err(err) => println!("{err}"),
            },
            "/preset" => match argument.trim().parse().ok().and_then(preset_question) {
                Some(question) => {
                    println!("> {question}");
                    print_answer(assistant.ask(&mut session, question).await);
                }
                None => println!("Choose a preset between 1 and 4."),
            },
            _ => print_answer(assistant.ask(&mut session, line).await),
        }
    }

    Ok(())
}

fn print_answer(outcome: AskOutcome) {
    match outcome {
        AskOutcome::Answered(text) | AskOutcome::Failed(text) | AskOutcome::Rejected(text) => {
            println!("{text}\n---");
        }
    }
}

async fn serve(config: &Config, assistant: Assistant) -> Result<()> {
    let app = api::create_router(ServerState::new(assistant));
    let (listener, port) = bind_listener(config.server_port).await?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16)> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        return Ok((listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }

    bail!("No available port found in range 4100-4199")
}
