//! Mailbrief CLI - email page summarisation
//!
//! The application logic is contained in lib.rs, and this file is
//! responsible for parsing arguments and handling top-level errors.

use clap::{Parser, Subcommand};
use colored::Colorize;
use mailbrief::{extract, Mode, Runtime, SettingsStore};
use std::str::FromStr;
use std::time::Duration;

const USER_AGENT: &str = concat!("mailbrief/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "mailbrief")]
#[command(author, version, about = "CLI for email page summarisation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise an email page from a saved HTML file or a URL
    Summarize {
        /// Path to a saved page, or an http(s) URL
        source: String,
        /// Show the extracted content instead of a summary
        #[arg(long)]
        raw: bool,
    },
    /// Show or change the stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored settings
    Show,
    /// Update stored settings; only the given fields change
    Set {
        /// "direct" or "proxy"
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        api_endpoint: Option<String>,
        #[arg(long)]
        proxy_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize { source, raw } => {
            println!("Loading: {}", source);
            let (html, url) = load_source(&source).await?;

            if raw {
                let document = scraper::Html::parse_document(&html);
                let snapshot = extract::extract(&document, &url);

                let title = if snapshot.title.is_empty() {
                    "No title".to_string()
                } else {
                    snapshot.title.clone()
                };
                println!("\n=== {} ===\n", title);
                println!("Subject: {}", snapshot.subject);
                println!("Header:  {}", snapshot.header_text);
                println!("\n{}", snapshot.combined_body);
                println!(
                    "\n--- Extracted {} characters ---",
                    snapshot.combined_body.len()
                );
            } else {
                let store = SettingsStore::open_default()?;
                let runtime = Runtime::start(store)?;
                let content = runtime.attach_page(&html, &url).await;

                let reply = runtime.summarize_active().await;
                if !reply.ok {
                    let reason = reply.error.unwrap_or_else(|| "no response".to_string());
                    anyhow::bail!("summarize failed: {}", reason);
                }

                let page = content.page.lock().await;
                let output = page
                    .panel()
                    .map(|panel| panel.output_text())
                    .unwrap_or_default();
                println!("\n=== Mail Quick Summary ===\n");
                if output.starts_with("Error") {
                    println!("{}", output.red());
                } else {
                    println!("{}", output);
                }
            }
        }
        Commands::Config { action } => {
            let store = SettingsStore::open_default()?;
            match action {
                ConfigAction::Show => {
                    let settings = store.load_stored()?;
                    println!("mode:         {}", settings.mode);
                    println!(
                        "api_key:      {}",
                        if settings.api_key.is_some() {
                            "(set)"
                        } else {
                            "(unset)"
                        }
                    );
                    println!(
                        "api_endpoint: {}",
                        settings.api_endpoint.as_deref().unwrap_or("(unset)")
                    );
                    println!(
                        "proxy_url:    {}",
                        settings.proxy_url.as_deref().unwrap_or("(unset)")
                    );
                }
                ConfigAction::Set {
                    mode,
                    api_key,
                    api_endpoint,
                    proxy_url,
                } => {
                    let mut settings = store.load_stored()?;
                    if let Some(mode) = mode {
                        settings.mode = Mode::from_str(&mode).map_err(anyhow::Error::msg)?;
                    }
                    if let Some(api_key) = api_key {
                        settings.api_key = Some(api_key);
                    }
                    if let Some(api_endpoint) = api_endpoint {
                        settings.api_endpoint = Some(api_endpoint);
                    }
                    if let Some(proxy_url) = proxy_url {
                        settings.proxy_url = Some(proxy_url);
                    }
                    store.save(&settings)?;
                    println!("{}", "Saved.".green());
                }
            }
        }
    }

    Ok(())
}

/// Load the page HTML from a file path or over HTTP
async fn load_source(source: &str) -> anyhow::Result<(String, String)> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        let html = client
            .get(source)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok((html, source.to_string()))
    } else {
        let html = std::fs::read_to_string(source)?;
        Ok((html, source.to_string()))
    }
}
