use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use tokio::sync::mpsc;

use tunup::app::App;
use tunup::backend::Backend;
use tunup::bridge::{Bridge, HostCall, RemoteLog};
use tunup::model::config::AppConfig;
use tunup::msg::Msg;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // Initialize logging to file (stdout carries the panel view)
    let log_dir = AppConfig::log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, &config.logging.file_name);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(config.logging.filter.as_str())
        .init();

    tracing::info!(base_url = %config.host.base_url, "tunup starting");

    let host = build_host(&config)?;
    let log = RemoteLog::new(host.clone(), config.bridge.forward_logs);
    let mut bridge = Bridge::new(host, log);
    if config.bridge.token_gate {
        bridge = bridge.with_token_gate();
    }
    let app = App::new(config, Backend::new(bridge));

    let result = run(app).await;
    if let Err(e) = &result {
        tracing::error!("tunup error: {e:?}");
    }
    result
}

#[cfg(feature = "http")]
fn build_host(config: &AppConfig) -> Result<Arc<dyn HostCall>> {
    Ok(Arc::new(tunup::bridge::host::HttpHost::new(config.clone())))
}

#[cfg(not(feature = "http"))]
fn build_host(_config: &AppConfig) -> Result<Arc<dyn HostCall>> {
    anyhow::bail!("built without the `http` feature: no host transport available")
}

async fn run(mut app: App) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();

    // Input thread: one command per stdin line
    let tx_input = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx_input.send(Msg::Command(line)).is_err() {
                break;
            }
        }
        let _ = tx_input.send(Msg::Quit);
    });

    tx.send(Msg::Setup)?;
    drop(tx);

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let Some(first) = rx.recv().await else {
            break;
        };
        app.update(first).await?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg).await?;
        }

        if app.should_quit {
            break;
        }

        render(&app)?;
    }

    tracing::info!("tunup stopped");
    Ok(())
}

fn render(app: &App) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for line in app.view() {
        writeln!(stdout, "{line}")?;
    }
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
