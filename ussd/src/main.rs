mod cli;
mod error;
mod terminal;

use std::sync::Arc;

use clap::Parser;
use cli::{Command, InteractiveArgs};
use error::AppError;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ussd_engine::{
    build_session_loop, AccountService, AppConfig, EngineConfig, FakeAccountService,
    HttpAccountService, KeyValueStore, MemoryStore, RocksDbStore, UserDataStore,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv(); // load .env if present

    let cli = cli::Cli::parse();

    // Initialize tracing
    let filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Shared cancellation token + signal handlers.
    let cancel = setup_signal_handlers();

    let store = match open_store(cli.store.store_dir.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to open store");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Interactive(args) => {
            info!(session_id = %args.session_id, "interactive session starting");
            if let Err(e) = run_interactive(args, store, cancel).await {
                tracing::error!(error = %e, "interactive session error");
                std::process::exit(1);
            }
        }

        Command::Dump(args) => {
            if let Err(e) = dump(&args.session_id, store).await {
                tracing::error!(error = %e, "dump error");
                std::process::exit(1);
            }
        }
    }
}

fn open_store(dir: Option<&str>) -> Result<Arc<dyn KeyValueStore>, AppError> {
    Ok(match dir {
        Some(dir) => Arc::new(RocksDbStore::open(dir)?),
        None => {
            info!("no store directory given, data is kept in memory");
            Arc::new(MemoryStore::new())
        }
    })
}

/// The REST service when a custodial URL is configured, otherwise a fake
/// holding one demo voucher.
fn account_service(args: &InteractiveArgs) -> Result<Arc<dyn AccountService>, AppError> {
    match &args.custodial_url {
        Some(custodial) => {
            let data = args.data_url.as_deref().unwrap_or(custodial);
            Ok(Arc::new(HttpAccountService::new(custodial, data)?))
        }
        None => {
            if args.data_url.is_some() {
                return Err(AppError::Config(
                    "--data-url requires --custodial-url".to_string(),
                ));
            }
            info!("no service URL given, using the offline fake service");
            let fake = FakeAccountService::new();
            fake.set_account("DEMO", "0x52908400098527886E0F7030069857D2E4169EE7");
            fake.set_active(true);
            fake.set_vouchers(vec![ussd_engine::testing::holding(
                "SRF",
                "100000000",
                "6",
                "0x1111111111111111111111111111111111111111",
            )]);
            Ok(Arc::new(fake))
        }
    }
}

async fn run_interactive(
    args: InteractiveArgs,
    store: Arc<dyn KeyValueStore>,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    if !matches!(args.language.as_str(), "eng" | "swa") {
        return Err(AppError::Config(format!(
            "unsupported language {:?}",
            args.language
        )));
    }

    let engine = EngineConfig {
        output_size: args.output_size,
        reset_on_empty_input: args.reset_on_empty_input,
        debug: args.engine_debug,
        ..Default::default()
    };
    let app = AppConfig {
        default_language: args.language.clone(),
        ..Default::default()
    };
    let service = account_service(&args)?;
    let session = build_session_loop(engine, app, store, service, cancel.clone())?;
    terminal::run_interactive(&session, &args.session_id, cancel).await
}

async fn dump(session_id: &str, store: Arc<dyn KeyValueStore>) -> Result<(), AppError> {
    let users = UserDataStore::new(Arc::clone(&store));
    let fields = users.dump(session_id, &[]).await?;
    if fields.is_empty() {
        info!(session_id, "no stored data");
    }
    for (dt, value) in fields {
        println!("{}\t{}", dt.name(), String::from_utf8_lossy(&value));
    }
    store.close().await?;
    Ok(())
}

/// Register SIGINT and SIGTERM handlers that trigger the returned token.
fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
        cancel_clone.cancel();
    });

    #[cfg(unix)]
    {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            sig.recv().await;
            info!("received SIGTERM, shutting down");
            cancel_clone.cancel();
        });
    }

    cancel
}
