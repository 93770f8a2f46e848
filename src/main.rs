use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sourcetap::browser::BrowserSession;
use sourcetap::core::config;
use sourcetap::core::error::NO_SOURCES_FOUND;
use sourcetap::dom::SourceNavigator;
use sourcetap::sink::{render_artifact, TextFileSink, UrlSink};
use sourcetap::{CdpCaptureBridge, CdpNavigator, Orchestrator, TextHeuristicLocator};

const DEFAULT_NOTEBOOK_URL: &str = "https://notebooklm.google.com/";
const DEFAULT_TAB_FRAGMENT: &str = "notebooklm.google.com";
const DEFAULT_DEBUG_PORT: u16 = 9222;

struct CliArgs {
    ws_url: Option<String>,
    port: Option<u16>,
    notebook_url: String,
    tab_fragment: String,
    auto_save: bool,
    out_dir: String,
}

fn usage() -> ! {
    eprintln!(
        "sourcetap — export NotebookLM source URLs without opening a single tab

USAGE:
    sourcetap [OPTIONS]

OPTIONS:
    --ws <url>       Attach to a running browser's CDP websocket endpoint
    --port <n>       Attach via http://127.0.0.1:<n>/json/version
                     (default when neither is given: launch a browser)
    --url <url>      Notebook URL to open in launch mode
    --tab <text>     Pick the tab whose URL contains <text>
                     (default: notebooklm.google.com)
    --no-save        Print the artifact to stdout instead of writing a file
    --out <dir>      Artifact output directory (default: current directory)
    --help           Show this help

Also honored: CHROME_EXECUTABLE, SOURCETAP_WS_URL, SOURCETAP_DEBUG_PORT,
SOURCETAP_OUT_DIR, SOURCETAP_CONFIG (path to sourcetap.json)."
    );
    std::process::exit(2);
}

fn parse_args() -> CliArgs {
    let mut parsed = CliArgs {
        ws_url: config::ws_url_override(),
        port: config::debug_port_override(),
        notebook_url: DEFAULT_NOTEBOOK_URL.to_string(),
        tab_fragment: DEFAULT_TAB_FRAGMENT.to_string(),
        auto_save: true,
        out_dir: std::env::var(config::ENV_OUT_DIR).unwrap_or_else(|_| ".".to_string()),
    };

    let mut args = std::env::args().skip(1).peekable();
    while let Some(a) = args.next() {
        match a.as_str() {
            "--ws" => parsed.ws_url = args.next(),
            "--port" => parsed.port = args.next().and_then(|v| v.parse().ok()),
            "--url" => {
                if let Some(v) = args.next() {
                    parsed.notebook_url = v;
                }
            }
            "--tab" => {
                if let Some(v) = args.next() {
                    parsed.tab_fragment = v;
                }
            }
            "--no-save" => parsed.auto_save = false,
            "--out" => {
                if let Some(v) = args.next() {
                    parsed.out_dir = v;
                }
            }
            "--help" | "-h" => usage(),
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
            }
        }
    }
    parsed
}

/// Poll until the source list renders, so a launch-mode user has time to log
/// in. Returns whether any entries appeared within `timeout`.
async fn wait_for_source_list(
    navigator: &impl SourceNavigator,
    timeout: Duration,
) -> anyhow::Result<bool> {
    let start = std::time::Instant::now();
    let mut hinted = false;
    loop {
        let _ = navigator.return_to_list().await;
        if navigator.count_entries().await? > 0 {
            return Ok(true);
        }
        if start.elapsed() >= timeout {
            return Ok(false);
        }
        if !hinted && start.elapsed() >= Duration::from_secs(5) {
            info!("waiting for the source list to render — log in and open your notebook if prompted");
            hinted = true;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = parse_args();
    let cfg = config::load_tap_config();
    let selectors = cfg.resolve_selectors();
    let timing = cfg.resolve_timing();

    // Attach when an endpoint is known, otherwise launch our own browser.
    let (session, launched) = if let Some(ws) = args.ws_url.clone() {
        (BrowserSession::attach_ws(ws).await?, false)
    } else if let Some(port) = args.port {
        (BrowserSession::attach_port(port).await?, false)
    } else {
        (
            BrowserSession::launch(&args.notebook_url, DEFAULT_DEBUG_PORT).await?,
            true,
        )
    };

    let page = session.find_page(&args.tab_fragment).await?;

    let locator = Arc::new(TextHeuristicLocator::new(
        selectors.clone(),
        cfg.resolve_min_candidate_text_len(),
    ));
    let navigator = CdpNavigator::new(page.clone(), selectors.clone(), timing, locator);
    let bridge = CdpCaptureBridge::new(page, selectors, timing);

    // Launch mode may sit on a login screen for a while; attached browsers
    // are expected to already show the notebook.
    let bootstrap = if launched {
        Duration::from_secs(120)
    } else {
        Duration::from_secs(10)
    };
    if !wait_for_source_list(&navigator, bootstrap).await? {
        warn!("no sources appeared within {:?} — proceeding anyway", bootstrap);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received — finishing the current entry, then stopping");
                cancel.cancel();
            }
        });
    }

    let orchestrator =
        Orchestrator::new(navigator, bridge, timing.settle).with_cancellation(cancel);
    let outcome = orchestrator
        .extract_all(|p| info!("progress: {}", p.label))
        .await;

    session.close().await;

    if let Some(err) = &outcome.error {
        if err == NO_SOURCES_FOUND {
            error!("{}", err);
        } else {
            error!("run stopped early: {} ({} URLs collected)", err, outcome.captured());
        }
    }

    if outcome.urls.is_empty() {
        if outcome.error.is_some() {
            std::process::exit(1);
        }
        return Ok(());
    }

    if args.auto_save {
        let sink = TextFileSink::new(&args.out_dir);
        match sink.save(&outcome.urls).await {
            Ok(path) => info!("artifact written: {}", path),
            Err(e) => {
                // Sink failure never erases collected results.
                error!("could not write artifact: {e:#}");
                println!("{}", render_artifact(&outcome.urls, chrono::Utc::now()));
            }
        }
    } else {
        println!("{}", render_artifact(&outcome.urls, chrono::Utc::now()));
    }

    info!(
        "done: {}/{} URLs captured",
        outcome.captured(),
        outcome.total
    );
    Ok(())
}
