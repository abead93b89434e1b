//! Socratic mentor binary - composition root.
//!
//! 1. Parse the CLI and load configuration from TOML
//! 2. Initialize tracing
//! 3. Open the SQLite conversation store
//! 4. Run the requested command: interactive chat, read-only observer, or
//!    config initialization

mod cli;
mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use mentor_chat::{
    ChatError, ChatSession, CommandSpeech, FallbackStrategy, HttpInferenceClient, MetricsSink,
    NullSpeech, ResponseOrchestrator, RevealPolicy, SessionDeps, SpeechSynthesizer,
    SqliteMessageStore, SqliteMetricsSink, StreamingPresenter,
};
use mentor_core::config::MentorConfig;
use mentor_core::events::SessionEvent;
use mentor_core::types::{GroupContext, GroupId};
use mentor_dictation::{InputBuffer, NoopCapabilityProvider, VoiceInputBridge};
use mentor_storage::{Database, MessageRepository, MetricsRepository};

use cli::{CliArgs, Command};
use terminal::{format_message, TerminalView};

const DB_FILE: &str = "mentor.db";

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(data_dir: &Path) -> Result<Arc<Database>, Box<dyn std::error::Error>> {
    if let Err(e) = std::fs::create_dir_all(data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join(DB_FILE);
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    Ok(Arc::new(db))
}

fn build_orchestrator(config: &MentorConfig, db: &Arc<Database>) -> ResponseOrchestrator {
    let fallback = FallbackStrategy::default();
    if !config.inference.enabled {
        tracing::info!("Inference disabled; replies come from the offline pool");
        return ResponseOrchestrator::offline(fallback);
    }

    match HttpInferenceClient::new(&config.inference) {
        Ok(client) => {
            tracing::info!(endpoint = %client.endpoint(), "Inference client ready");
            let metrics: Arc<dyn MetricsSink> = Arc::new(SqliteMetricsSink::new(Arc::new(
                MetricsRepository::new(Arc::clone(db)),
            )));
            ResponseOrchestrator::with_inference(Arc::new(client), fallback, metrics)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Inference client unavailable; using offline pool");
            ResponseOrchestrator::offline(fallback)
        }
    }
}

fn build_speech(config: &MentorConfig) -> Arc<dyn SpeechSynthesizer> {
    match CommandSpeech::from_config(&config.speech) {
        Some(speech) => Arc::new(speech),
        None => Arc::new(NullSpeech),
    }
}

fn print_help(session: &ChatSession) {
    println!("Escribe tu mensaje y pulsa Enter.");
    println!("  /history  muestra la conversación");
    if session.voice_control_visible() {
        println!("  /voice    activa o desactiva el dictado");
    }
    println!("  /quit     salir");
}

async fn run_chat(
    config: &MentorConfig,
    db: Arc<Database>,
    group_id: GroupId,
    group: GroupContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteMessageStore::new(Arc::new(MessageRepository::new(
        Arc::clone(&db),
    ))));
    let presenter = StreamingPresenter::new(
        Arc::new(TerminalView::new()),
        build_speech(config),
        RevealPolicy::from_config(&config.presenter, &config.speech),
    );
    // No platform speech recognizer is wired into the terminal front end.
    let voice = VoiceInputBridge::new(&NoopCapabilityProvider, &config.voice, InputBuffer::new());

    let deps = SessionDeps {
        store,
        orchestrator: Arc::new(build_orchestrator(config, &db)),
        presenter: Arc::new(presenter),
        voice: Arc::new(voice),
    };
    let session = ChatSession::open(group_id, group, config.chat.clone(), deps).await;

    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::TurnCompleted { group_id, mentor, .. } => {
                    tracing::debug!(%group_id, mentor_id = %mentor.id, "Turn completed");
                }
                other => tracing::debug!(group_id = %other.group_id(), "Session event"),
            }
        }
    });

    for message in session.messages() {
        println!("{}", format_message(&message));
    }
    print_help(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/history" => {
                for message in session.messages() {
                    println!("{}", format_message(&message));
                }
            }
            "/voice" if session.voice_control_visible() => {
                if let Err(e) = session.voice().toggle() {
                    eprintln!("No se pudo iniciar el dictado: {}", e);
                }
            }
            text => {
                session.input().set(text);
                match session.send_input().await {
                    Ok(outcome) => {
                        outcome.reveal.finished().await;
                    }
                    Err(ChatError::SendInProgress) => {
                        eprintln!("Espera a que el mentor termine de responder.");
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
    }

    session.close();
    Ok(())
}

async fn run_observe(
    db: Arc<Database>,
    group_id: GroupId,
    follow: bool,
    interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = MessageRepository::new(db);
    let mut shown = 0usize;

    let print_new = |shown: &mut usize| -> Result<(), Box<dyn std::error::Error>> {
        if repo.count_by_group(&group_id)? as usize <= *shown {
            return Ok(());
        }
        let history = repo.fetch_by_group(&group_id)?;
        for message in history.iter().skip(*shown) {
            println!("{}", format_message(message));
        }
        *shown = history.len();
        Ok(())
    };

    print_new(&mut shown)?;
    if !follow {
        return Ok(());
    }

    tracing::info!(group_id = %group_id, interval_secs, "Following conversation");
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    interval.tick().await;
    loop {
        tokio::select! {
            _ = interval.tick() => print_new(&mut shown)?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )
        .into());
    }
    MentorConfig::default().save(path)?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_file: PathBuf = args.resolve_config_path();

    // Tracing needs the configured level, so load first and report after.
    let loaded = MentorConfig::load(&config_file);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => MentorConfig::default(),
    };
    init_tracing(&args.resolve_log_level(&config.general.log_level));

    tracing::info!("Starting socratic-mentor v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid configuration; using defaults")
        }
        Err(_) => tracing::info!(path = %config_file.display(), "No configuration file; using defaults"),
    }

    match args.command {
        Command::InitConfig { force } => run_init_config(&config_file, force),
        Command::Chat {
            ref group,
            ref project,
            ref milestones,
        } => {
            let db = open_database(&args.resolve_data_dir(&config.general.data_dir))?;
            let context = GroupContext {
                name: project.clone(),
                milestones: milestones.clone(),
            };
            run_chat(&config, db, GroupId::new(group.as_str()), context).await
        }
        Command::Observe {
            ref group,
            follow,
            interval_secs,
        } => {
            let db = open_database(&args.resolve_data_dir(&config.general.data_dir))?;
            run_observe(db, GroupId::new(group.as_str()), follow, interval_secs).await
        }
    }
}
