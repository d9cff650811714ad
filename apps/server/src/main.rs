use std::path::PathBuf;

use anyhow::Context;
use backstage_config::{load_from as load_config, AppConfig};
use backstage_gateway::{build_router, AppState};
use backstage_runtime::{telemetry, BackendServices};
use backstage_users::{ParticipantKind, ParticipantRef};
use clap::{Parser, Subcommand};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "backstage")]
#[command(about = "Backstage messaging backend (serves by default)")]
struct Cli {
    /// Configuration file; overrides BACKSTAGE_CONFIG and discovery
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and realtime server
    Serve {
        /// Bind address, overrides http.address
        #[arg(long)]
        address: Option<String>,
        /// Bind port, overrides http.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create an artist or producer account
    AddParticipant {
        #[arg(long)]
        kind: ParticipantKind,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        username: String,
    },
    /// Print a bearer token for an existing account
    IssueToken {
        #[arg(long)]
        kind: ParticipantKind,
        #[arg(long)]
        id: i64,
    },
    /// Dump rooms, participants and messages from the database
    DumpRooms,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        address: None,
        port: None,
    }) {
        Commands::Serve { address, port } => run_server(config, address, port).await,
        Commands::AddParticipant { kind, id, username } => {
            add_participant(&config, kind, id, &username).await
        }
        Commands::IssueToken { kind, id } => issue_token(&config, ParticipantRef::new(kind, id)).await,
        Commands::DumpRooms => dump_rooms(&config).await,
    }
}

async fn initialise(config: &AppConfig) -> anyhow::Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

async fn run_server(
    mut config: AppConfig,
    address: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    info!("starting Backstage messaging backend");

    if let Some(address) = address {
        config.http.address = address;
    }
    if let Some(port) = port {
        config.http.port = port;
    }

    let services = initialise(&config).await?;

    let state = AppState::new(
        services.authenticator.clone(),
        services.chats.clone(),
        config.realtime.group_capacity,
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(backstage_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn add_participant(
    config: &AppConfig,
    kind: ParticipantKind,
    id: i64,
    username: &str,
) -> anyhow::Result<()> {
    let services = initialise(config).await?;

    let participant = services
        .accounts
        .insert(kind, id, username)
        .await
        .with_context(|| format!("failed to create {kind} {id}"))?;

    println!(
        "Created {} {} ({})",
        participant.kind, participant.id, participant.username
    );
    Ok(())
}

async fn issue_token(config: &AppConfig, participant: ParticipantRef) -> anyhow::Result<()> {
    let services = initialise(config).await?;

    let known = services
        .accounts
        .find(participant)
        .await
        .context("failed to look up participant")?;
    if known.is_none() {
        anyhow::bail!("{participant} does not exist");
    }

    let token = services
        .authenticator
        .issue_token(participant)
        .context("failed to issue token")?;
    println!("{token}");
    Ok(())
}

async fn dump_rooms(config: &AppConfig) -> anyhow::Result<()> {
    info!("dumping chat rooms from database");

    let services = initialise(config).await?;

    let rooms = sqlx::query(
        r#"
        SELECT id, name, pair_key, created_at
        FROM chat_rooms
        ORDER BY id ASC
        "#,
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch chat rooms")?;

    println!("=== ROOMS ===");
    if rooms.is_empty() {
        println!("No rooms found in database");
    } else {
        println!("Found {} rooms:", rooms.len());
        println!(
            "{:<5} {:<30} {:<40} {:<30}",
            "ID", "Name", "Pair Key", "Created At"
        );
        println!("{}", "-".repeat(108));

        for room in rooms {
            let id: i64 = room.get("id");
            let name: String = room.get("name");
            let pair_key: Option<String> = room.get("pair_key");
            let created_at: String = room.get("created_at");

            println!(
                "{:<5} {:<30} {:<40} {:<30}",
                id,
                name,
                pair_key.as_deref().unwrap_or("NULL"),
                created_at
            );
        }
    }

    println!("\n=== PARTICIPANTS ===");
    let participants = sqlx::query(
        r#"
        SELECT chat_room_id, participant_kind, participant_id, joined_at
        FROM chat_room_participants
        ORDER BY chat_room_id ASC, joined_at ASC
        "#,
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch chat room participants")?;

    if participants.is_empty() {
        println!("No participants found in database");
    } else {
        println!("Found {} participants:", participants.len());
        println!(
            "{:<10} {:<10} {:<12} {:<30}",
            "Room ID", "Kind", "Account ID", "Joined At"
        );
        println!("{}", "-".repeat(65));

        for participant in participants {
            let room_id: i64 = participant.get("chat_room_id");
            let kind: String = participant.get("participant_kind");
            let account_id: i64 = participant.get("participant_id");
            let joined_at: String = participant.get("joined_at");

            println!(
                "{:<10} {:<10} {:<12} {:<30}",
                room_id, kind, account_id, joined_at
            );
        }
    }

    println!("\n=== MESSAGES ===");
    let messages = sqlx::query(
        r#"
        SELECT id, room_id, sender_kind, sender_id, content, timestamp, file_name
        FROM messages
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch messages")?;

    if messages.is_empty() {
        println!("No messages found in database");
    } else {
        println!("Found {} messages:", messages.len());
        println!(
            "{:<5} {:<8} {:<20} {:<50} {:<20} {:<30}",
            "ID", "Room", "Sender", "Content (truncated)", "Attachment", "Timestamp"
        );
        println!("{}", "-".repeat(138));

        for message in messages {
            let id: i64 = message.get("id");
            let room_id: Option<i64> = message.get("room_id");
            let sender_kind: String = message.get("sender_kind");
            let sender_id: i64 = message.get("sender_id");
            let content: String = message.get("content");
            let timestamp: String = message.get("timestamp");
            let file_name: Option<String> = message.get("file_name");

            let content_display = if content.chars().count() > 47 {
                format!("{}...", content.chars().take(44).collect::<String>())
            } else {
                content
            };

            println!(
                "{:<5} {:<8} {:<20} {:<50} {:<20} {:<30}",
                id,
                room_id
                    .map(|id| id.to_string())
                    .unwrap_or("NULL".to_string()),
                format!("{sender_kind}:{sender_id}"),
                content_display,
                file_name.as_deref().unwrap_or("-"),
                timestamp
            );
        }
    }

    Ok(())
}
