use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_interview::audio::{AudioSink, NullSink, SpeakerSink};
use voice_interview::session::{ConsoleView, HttpCredentialSource};
use voice_interview::transport::{HttpNegotiator, WebRtcTransportFactory};
use voice_interview::{
    create_router, AppState, AudioBackendConfig, AudioBackendFactory, Config, Profile,
    SessionCommand, SessionConfig, SessionController, SessionDeps,
};

#[derive(Parser)]
#[command(name = "voice-interview", version, about = "Voice interview widget")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voice-interview")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the credential issuer
    Serve,
    /// Start a console voice session against a running issuer
    Talk,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Voice Interview v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Talk => talk(cfg).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let state = AppState::new(cfg.provider.clone(), &Profile::DEFAULT)?;
    if state.api_key().is_none() {
        warn!(
            "{} is not set; session requests will fail until it is",
            cfg.provider.api_key_env
        );
    }

    let app = create_router(state);
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Credential issuer listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn talk(cfg: Config) -> Result<()> {
    let profile = Profile::DEFAULT;

    let speaker: Arc<dyn AudioSink> = match SpeakerSink::open() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!("No playback device ({:#}); remote audio will be dropped", e);
            Arc::new(NullSink)
        }
    };

    let deps = SessionDeps {
        credentials: Arc::new(HttpCredentialSource::new(cfg.client.session_url.clone())),
        devices: Arc::new(AudioBackendFactory::new(AudioBackendConfig::default())),
        transports: Arc::new(WebRtcTransportFactory::new(
            cfg.client.ice_servers.clone(),
            speaker,
        )),
        negotiator: Arc::new(HttpNegotiator::new(cfg.client.calls_url.clone())),
    };

    let view = Box::new(ConsoleView::new(profile.name));
    let (mut controller, events) =
        SessionController::new(deps, view, SessionConfig::from_client(&cfg.client, &profile));

    let (commands_tx, commands_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let command = match line.trim() {
                "" => SessionCommand::Toggle,
                "/quit" => SessionCommand::Quit,
                text => SessionCommand::Ask(text.to_string()),
            };
            let quit = command == SessionCommand::Quit;
            if commands_tx.send(command).await.is_err() || quit {
                break;
            }
        }
    });

    println!("Press Enter to connect or disconnect, type to ask, /quit to exit");
    controller.run(commands_rx, events).await;

    Ok(())
}
