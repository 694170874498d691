use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragdesk::app_state::AppState;
use ragdesk::config::AppConfig;
use ragdesk::models::event::{FailureReason, TrackerEvent};
use ragdesk::services::presenter::{self, ConfidenceLevel};

#[derive(Parser)]
#[command(name = "ragdesk", version, about = "Upload documents to a local RAG service and query them")]
struct Cli {
    /// Ingestion service URL (overrides API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a .pdf or .txt file and follow its indexing until it finishes
    Upload { file: PathBuf },
    /// List indexed documents
    Documents,
    /// Ask a question, optionally restricted to one document
    Ask {
        question: String,
        /// Only search this document
        #[arg(long)]
        doc: Option<String>,
        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },
    /// Print the viewer URL for a document page
    Open {
        doc_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Download the original document
    Download {
        doc_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Structured logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration from environment")?;
    let state = AppState::from_config(&config, cli.api_url.as_deref())
        .context("Failed to initialize ingestion service client")?;

    tracing::debug!(base_url = %state.client.base_url(), "Client ready");

    match cli.command {
        Command::Upload { file } => upload(&state, &file).await,
        Command::Documents => documents(&state).await,
        Command::Ask {
            question,
            doc,
            stream,
        } => ask(&state, &question, doc.as_deref(), stream).await,
        Command::Open { doc_id, page } => {
            println!("{}", state.client.viewer_url(&doc_id, page)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Download { doc_id, output } => download(&state, &doc_id, &output).await,
    }
}

async fn upload(state: &AppState, path: &Path) -> anyhow::Result<ExitCode> {
    let (mut dispatcher, mut events) = state.dispatcher();

    println!("{}", presenter::UPLOADING);
    // Failures are published on the event stream as well; the loop below reports them.
    let _ = dispatcher.submit_path(path).await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut interrupted = false;
    let mut last_line: Option<String> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(ExitCode::FAILURE);
                };

                if let Some(line) = presenter::status_line(&event) {
                    if last_line.as_ref() != Some(&line) {
                        println!("{line}");
                        last_line = Some(line);
                    }
                }

                match event {
                    TrackerEvent::Succeeded { document_id, .. } => {
                        println!("Document id: {document_id}");
                        return Ok(ExitCode::SUCCESS);
                    }
                    TrackerEvent::Failed { reason, .. } => {
                        if let FailureReason::Submission(detail) = &reason {
                            eprintln!("{detail}");
                        }
                        return Ok(ExitCode::FAILURE);
                    }
                    TrackerEvent::Cancelled { job_id } => {
                        println!("Stopped tracking job {job_id}");
                        return Ok(ExitCode::from(130));
                    }
                    TrackerEvent::Progress { .. } | TrackerEvent::TransientError { .. } => {}
                }
            }
            _ = &mut shutdown, if !interrupted => {
                interrupted = true;
                if !dispatcher.cancel() {
                    return Ok(ExitCode::from(130));
                }
            }
        }
    }
}

async fn documents(state: &AppState) -> anyhow::Result<ExitCode> {
    let documents = state
        .client
        .list_documents()
        .await
        .context("Failed to list documents")?;

    if documents.is_empty() {
        println!("No documents indexed yet");
    }
    for document in documents {
        println!(
            "{}  {} ({})",
            document.doc_id,
            document.filename,
            presenter::short_id(&document.doc_id)
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn ask(
    state: &AppState,
    question: &str,
    doc_id: Option<&str>,
    stream: bool,
) -> anyhow::Result<ExitCode> {
    if question.trim().is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    if stream {
        let mut stdout = std::io::stdout();
        state
            .client
            .query_stream(question, doc_id, |text| {
                print!("{text}");
                let _ = stdout.flush();
            })
            .await
            .context("Error while querying")?;
        println!();
        return Ok(ExitCode::SUCCESS);
    }

    let answer = state
        .client
        .query(question, doc_id)
        .await
        .context("Error while querying")?;

    println!("{}", answer.answer);

    if let Some(percent) = presenter::confidence_percent(answer.confidence) {
        println!(
            "\nAnswer confidence: {percent}% ({:?})",
            ConfidenceLevel::from_percent(percent)
        );
    }

    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!("- {}", presenter::source_label(source));
            if let Some(preview) = source.preview.as_deref().filter(|p| !p.is_empty()) {
                println!("  {preview}");
            }
            if let Some(url) = source
                .viewer_target()
                .and_then(|(doc_id, page)| state.client.viewer_url(doc_id, page).ok())
            {
                println!("  {url}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn download(state: &AppState, doc_id: &str, output: &Path) -> anyhow::Result<ExitCode> {
    let bytes = state
        .client
        .fetch_document(doc_id)
        .await
        .with_context(|| format!("Failed to fetch document {doc_id}"))?;

    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Saved {} bytes to {}", bytes.len(), output.display());
    Ok(ExitCode::SUCCESS)
}
