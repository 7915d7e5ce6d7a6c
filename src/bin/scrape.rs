use rolecase::capture::{HttpPageCapture, PageCapture};
use rolecase::extract::scrape_html;
use std::env;
use std::process::ExitCode;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "usage: rolecase-scrape <url> [--html <file>]";

#[tokio::main]
async fn main() -> ExitCode {
    // logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    let _ = dotenvy::dotenv();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(url) = args.first().filter(|a| !a.starts_with("--")) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };
    let html_file = args
        .iter()
        .position(|a| a == "--html")
        .and_then(|i| args.get(i + 1));

    let html = match html_file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to read {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let fetched = match HttpPageCapture::new() {
                Ok(capture) => capture.capture(url).await,
                Err(e) => Err(e),
            };
            match fetched {
                Ok(html) => html,
                Err(e) => {
                    error!("Failed to fetch {}: {}", url, e);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match scrape_html(url, &html) {
        Ok(scraped) => match serde_json::to_string_pretty(&scraped) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to encode result: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
