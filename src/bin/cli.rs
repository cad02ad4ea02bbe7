//! Out-Pass CLI
//!
//! Command-line portal for the student out-pass system:
//! - Register and log in
//! - Submit out-pass requests
//! - Watch the request list update live
//! - Save approved QR passes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use outpass::client::{
    ApiClient, ClientConfig, ClientError, OutPassDraft, OutPassRequest, RegisterProfile,
};
use outpass::config::Config;
use outpass::feed::RequestFeed;
use outpass::guard::{Access, Route, RouteGuard};
use outpass::livesync::{LiveSyncChannel, LiveSyncConfig};
use outpass::session::{Session, Token};

#[derive(Parser)]
#[command(name = "outpass")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Student out-pass portal client")]
#[command(long_about = "Command-line portal for hostel out-pass requests.\nSubmit requests, watch approvals arrive live, and save the QR pass for the gate.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL (overrides config)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Session profile directory (overrides config)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a student account and start a session
    Register {
        /// Full name
        #[arg(long)]
        name: String,
        /// Roll number
        #[arg(long)]
        roll_no: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Password
        #[arg(long)]
        password: String,
    },

    /// Log in and store the session token
    Login {
        /// Email address
        email: String,
        /// Password
        password: String,
    },

    /// End the session
    Logout,

    /// Submit an out-pass request
    Submit {
        /// Reason for leaving
        reason: String,
        /// Date and time out (e.g. 2024-05-01T09:00)
        #[arg(long)]
        date_out: String,
        /// Expected return time
        #[arg(long)]
        return_time: String,
    },

    /// List your out-pass requests
    List,

    /// Watch your requests and print updates as they arrive
    Watch,

    /// Show session and backend status
    Status,

    /// Save an approved request's QR pass as a PNG file
    Qr {
        /// Request id (defaults to the newest request with a QR pass)
        id: Option<String>,
        /// Output file (default: outpass-<id>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(backend) = &cli.backend {
        config.backend.url = backend.clone();
    }
    if let Some(profile) = &cli.profile {
        config.state.dir = profile.clone();
    }

    match cli.command {
        Commands::Register {
            name,
            roll_no,
            email,
            password,
        } => {
            let session = Session::open(&config.state.dir)?;
            let client = build_client(&config, session.clone());

            let profile = RegisterProfile {
                name: name.clone(),
                roll_no: roll_no.clone(),
                email,
                password,
            };
            match client.register(&profile).await {
                Ok(token) => {
                    session.set(Token::new(token.access_token))?;
                    println!("Registered {} ({}) and logged in.", name, roll_no);
                }
                Err(e) => fail(&config, e),
            }
        }

        Commands::Login { email, password } => {
            let session = Session::open(&config.state.dir)?;
            let client = build_client(&config, session.clone());

            match client.login(&email, &password).await {
                Ok(token) => {
                    session.set(Token::new(token.access_token))?;
                    println!("Logged in as {}.", email);
                }
                Err(e) => fail(&config, e),
            }
        }

        Commands::Logout => {
            let session = Session::open(&config.state.dir)?;
            if session.is_authenticated() {
                session.clear()?;
                println!("Logged out.");
            } else {
                println!("No active session.");
            }
        }

        Commands::Submit {
            reason,
            date_out,
            return_time,
        } => {
            let session = Session::open(&config.state.dir)?;
            require_session(&RouteGuard::new(session.clone()));
            let feed = RequestFeed::new(build_client(&config, session));

            let draft = OutPassDraft {
                reason,
                date_out,
                return_time,
            };
            match feed.submit(&draft).await {
                Ok(created) => {
                    println!("Submitted request {} ({}).", short_id(&created.id), created.status);
                    println!();
                    print_requests(&feed.snapshot().items);
                }
                Err(e) => fail(&config, e),
            }
        }

        Commands::List => {
            let session = Session::open(&config.state.dir)?;
            require_session(&RouteGuard::new(session.clone()));
            let client = build_client(&config, session);

            match client.list_my_requests().await {
                Ok(items) => match cli.format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&items)?),
                    _ => print_requests(&items),
                },
                Err(e) => fail(&config, e),
            }
        }

        Commands::Watch => {
            let session = Session::open(&config.state.dir)?;
            require_session(&RouteGuard::new(session.clone()));

            let feed = RequestFeed::new(build_client(&config, session.clone()));
            let channel = LiveSyncChannel::new(live_config(&config), session);
            let (handle, events) = channel.start();

            let mut snapshots = feed.subscribe();
            let mut runner = {
                let feed = feed.clone();
                tokio::spawn(async move { feed.run(events).await })
            };

            println!("Watching out-pass requests (Ctrl+C to stop)");
            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = snapshots.borrow_and_update().clone();
                        println!();
                        print_requests(&snapshot.items);
                    }
                    result = &mut runner => {
                        if let Ok(Err(e)) = result {
                            eprintln!("{}", e);
                            std::process::exit(1);
                        }
                        println!("Session ended.");
                        break;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!();
                        break;
                    }
                }
            }
            handle.stop().await;
            runner.abort();
        }

        Commands::Status => {
            let session = Session::open(&config.state.dir)?;
            let client = build_client(&config, session.clone());

            println!("outpass v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Backend: {}", config.backend.url);
            println!(
                "Session: {}",
                if session.is_authenticated() {
                    "active"
                } else {
                    "none"
                }
            );

            match client.health().await {
                Ok(status) => println!("API Status: {}", status.message),
                Err(e) => fail(&config, e),
            }
        }

        Commands::Qr { id, output } => {
            let session = Session::open(&config.state.dir)?;
            require_session(&RouteGuard::new(session.clone()));
            let client = build_client(&config, session);

            let items = match client.list_my_requests().await {
                Ok(items) => items,
                Err(e) => fail(&config, e),
            };

            let item = match &id {
                Some(id) => items
                    .iter()
                    .find(|item| item.id == *id || item.id.starts_with(id)),
                None => items.iter().find(|item| item.qr_code_data_url.is_some()),
            };
            let Some(item) = item else {
                match id {
                    Some(id) => eprintln!("Request {} not found.", id),
                    None => eprintln!("No requests with a QR pass yet."),
                }
                std::process::exit(1);
            };

            let png = match item.qr_png() {
                Ok(Some(png)) => png,
                Ok(None) => {
                    eprintln!(
                        "Request {} has no QR pass (status {}).",
                        short_id(&item.id),
                        item.status
                    );
                    std::process::exit(1);
                }
                Err(e) => fail(&config, e),
            };

            let path = output.unwrap_or_else(|| PathBuf::from(item.qr_filename()));
            std::fs::write(&path, &png)?;
            println!("QR pass saved to {:?}", path);
        }

        Commands::Config { output } => {
            let config = outpass::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn build_client(config: &Config, session: Session) -> ApiClient {
    let client_config = ClientConfig {
        backend_url: config.backend.url.clone(),
        request_timeout_secs: config.backend.request_timeout_secs,
    };
    match ApiClient::new(client_config, session) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build API client: {}", e);
            std::process::exit(1);
        }
    }
}

fn live_config(config: &Config) -> LiveSyncConfig {
    LiveSyncConfig {
        backend_url: config.backend.url.clone(),
        max_reconnect_attempts: config.livesync.max_reconnect_attempts,
        initial_backoff_ms: config.livesync.initial_backoff_ms,
        max_backoff_ms: config.livesync.max_backoff_ms,
        poll_interval_secs: config.livesync.poll_interval_secs,
        ping_interval_secs: config.livesync.ping_interval_secs,
        connect_timeout_secs: config.livesync.connect_timeout_secs,
    }
}

fn require_session(guard: &RouteGuard) {
    if let Access::Redirect { .. } = guard.resolve(Route::Dashboard) {
        eprintln!("Not logged in.");
        eprintln!();
        eprintln!("Log in first:");
        eprintln!("  outpass login <email> <password>");
        std::process::exit(1);
    }
}

fn fail(config: &Config, e: ClientError) -> ! {
    eprintln!("{}", e);
    if matches!(e, ClientError::Unavailable | ClientError::Timeout) {
        eprintln!();
        eprintln!("Cannot reach the out-pass backend at {}", config.backend.url);
        eprintln!("Make sure it is running:");
        eprintln!("  cargo run --bin outpass-server");
    }
    std::process::exit(1);
}

fn print_requests(items: &[OutPassRequest]) {
    if items.is_empty() {
        println!("No out-pass requests yet.");
        println!();
        println!("Submit your first request with:");
        println!("  outpass submit \"Reason\" --date-out 2024-05-01T09:00 --return-time 2024-05-01T18:00");
        return;
    }

    println!(
        "{:<10} {:<26} {:<18} {:<18} {:<10} {}",
        "Id", "Reason", "Out", "Return", "Status", "QR"
    );
    println!("{}", "-".repeat(90));

    for item in items {
        println!(
            "{:<10} {:<26} {:<18} {:<18} {:<10} {}",
            short_id(&item.id),
            truncate(&item.reason, 25),
            item.date_out,
            item.return_time,
            item.status,
            if item.qr_code_data_url.is_some() {
                "yes"
            } else {
                "-"
            }
        );
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 3).collect();
        format!("{}...", kept)
    }
}
