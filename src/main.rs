use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomwatch::api::{ChatApi, Credentials, RequestGate, TfsChatApi};
use roomwatch::config::Args;
use roomwatch::event::{ControlAction, Driver, Event, EventBus, ShutdownReason};
use roomwatch::{AppError, CommandDispatcher, RoomWatcher, WatchConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing; stdout carries the event stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let code = match run(args).await {
        Ok(ShutdownReason::WatcherFailed(failure)) => {
            error!(error = %failure, "Stopped after watcher failure");
            1
        }
        Ok(reason) => {
            info!(reason = ?reason, "Stopped");
            0
        }
        Err(e) => {
            error!(error = %e, "Fatal error");
            1
        }
    };

    // A blocked stdin read would otherwise hold the runtime open
    std::process::exit(code);
}

async fn run(args: Args) -> Result<ShutdownReason, AppError> {
    let config = WatchConfig::try_from(&args)?;

    let gate = RequestGate::new(Credentials::new(&args.user, &args.password));
    let api: Arc<dyn ChatApi> = Arc::new(TfsChatApi::login(&args.url, gate.clone()).await?);

    let (bus, events) = EventBus::channel(config.channel_capacity);
    let shutdown = CancellationToken::new();

    bus.emit(Event::AccountLogin {
        account: api.account().clone(),
    })
    .await;

    let watcher = RoomWatcher::new(api.clone(), config, bus.clone(), shutdown.clone()).spawn();

    let dispatcher = CommandDispatcher::new(api, bus.clone(), shutdown.clone());
    tokio::spawn(dispatcher.run(BufReader::new(tokio::io::stdin())));

    tokio::spawn(forward_interrupt(bus, shutdown.clone()));

    let reason = Driver::new(events, shutdown, tokio::io::stdout())
        .run(watcher)
        .await;

    let totals = gate.enter().await;
    info!(
        requests = totals.requests(),
        failures = totals.failures(),
        "Request totals"
    );

    reason
}

/// Delivers Ctrl-C as an `interface quit` event
async fn forward_interrupt(bus: EventBus, shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Could not listen for Ctrl-C");
                return;
            }
            bus.emit(Event::Interface { action: ControlAction::Quit }).await;
        }
    }
}
