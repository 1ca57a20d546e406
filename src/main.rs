use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smart_scheduler::{
    create_router, terminal, AppState, AuthClient, Config, Coordinator, SessionIdentity,
    SpeechFactory, WebSocketTransport,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "smart-scheduler", version, about = "Schedule meetings by talking to an agent")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/smart-scheduler")]
    config: String,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Converse in the terminal (default)
    Chat,
    /// Expose the session over the HTTP control API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Smart Scheduler v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Agent channel: {}", cfg.backend.ws_url);

    check_calendar_auth(&cfg).await;

    let identity = SessionIdentity::generate();
    let transport = WebSocketTransport::new(&cfg.backend.ws_url)?;
    let coordinator = Coordinator::new(
        identity,
        cfg.session_config(),
        Box::new(transport),
        SpeechFactory::recognizer(&cfg.speech),
        SpeechFactory::synthesizer(&cfg.speech),
    );

    let handle = coordinator.handle();
    let runner = tokio::spawn(coordinator.run());

    match cli.mode.unwrap_or(Mode::Chat) {
        Mode::Chat => terminal::run(handle.clone()).await?,
        Mode::Serve => {
            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Control API listening on {}", addr);

            axum::serve(listener, create_router(AppState::new(handle.clone())))
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
    }

    if let Err(e) = handle.shutdown().await {
        warn!("Coordinator shutdown: {}", e);
    }
    runner.await?;

    Ok(())
}

/// The agent needs calendar access before it can propose slots
async fn check_calendar_auth(cfg: &Config) {
    let auth = match AuthClient::new(&cfg.backend.api_url) {
        Ok(auth) => auth,
        Err(e) => {
            warn!("Auth check skipped: {:#}", e);
            return;
        }
    };

    match auth.status().await {
        Ok(status) if status.authenticated => info!("Calendar connected"),
        Ok(_) => match auth.login_url().await {
            Ok(url) => println!("Connect your calendar first: {}", url),
            Err(e) => warn!("Calendar not connected and login URL unavailable: {:#}", e),
        },
        Err(e) => warn!("Auth status unavailable: {:#}", e),
    }
}
