use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facewatch_core::{Gallery, Identity};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facewatch", about = "Facewatch face tracking CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon status
    Status,
    /// List identities in the gallery
    List,
    /// Set the minimum seconds between uploads
    SetUploadInterval {
        /// Seconds (at least 1)
        seconds: u32,
    },
    /// Set the minimum seconds between recognition passes
    SetRecognitionInterval {
        /// Seconds (at least 1)
        seconds: u32,
    },
    /// Forget every stored identity
    Clear,
    /// Inspect a gallery snapshot file without the daemon
    Inspect {
        /// Path to the gallery JSON file
        path: PathBuf,
    },
}

#[zbus::proxy(
    interface = "org.facewatch.Facewatch1",
    default_service = "org.facewatch.Facewatch1",
    default_path = "/org/facewatch/Facewatch1"
)]
trait Facewatch {
    async fn set_upload_interval(&self, seconds: u32) -> zbus::Result<()>;
    async fn set_recognition_interval(&self, seconds: u32) -> zbus::Result<()>;
    async fn status(&self) -> zbus::Result<String>;
    async fn list_identities(&self) -> zbus::Result<String>;
    async fn clear_gallery(&self) -> zbus::Result<bool>;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Inspect { path } = &cli.command {
        let gallery = load_snapshot(path)?;
        print!("{}", describe_gallery(&gallery));
        return Ok(());
    }

    let conn = zbus::Connection::session()
        .await
        .context("cannot reach the session bus")?;
    let proxy = FacewatchProxy::new(&conn)
        .await
        .context("facewatchd is not running")?;

    match cli.command {
        Commands::Status => {
            let json: serde_json::Value = serde_json::from_str(&proxy.status().await?)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::List => {
            let json: serde_json::Value = serde_json::from_str(&proxy.list_identities().await?)?;
            let entries = json.as_array().cloned().unwrap_or_default();
            if entries.is_empty() {
                println!("No identities stored");
            }
            for entry in entries {
                println!(
                    "{}\t{}",
                    entry["name"].as_str().unwrap_or("?"),
                    entry["dimension"]
                );
            }
        }
        Commands::SetUploadInterval { seconds } => {
            proxy.set_upload_interval(seconds).await?;
            println!("Upload interval set to {seconds}s");
        }
        Commands::SetRecognitionInterval { seconds } => {
            proxy.set_recognition_interval(seconds).await?;
            println!("Recognition interval set to {seconds}s");
        }
        Commands::Clear => {
            if proxy.clear_gallery().await? {
                println!("Gallery cleared");
            } else {
                println!("Gallery was already empty");
            }
        }
        Commands::Inspect { .. } => {}
    }

    Ok(())
}

/// Load a snapshot the way the daemon restores it: malformed entries are skipped.
fn load_snapshot(path: &Path) -> Result<Gallery> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let snapshot: Vec<Identity> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a gallery snapshot", path.display()))?;
    tracing::debug!(entries = snapshot.len(), "snapshot parsed");

    let mut gallery = Gallery::new();
    gallery.restore(snapshot);
    Ok(gallery)
}

fn describe_gallery(gallery: &Gallery) -> String {
    if gallery.is_empty() {
        return "No identities stored\n".to_string();
    }
    let mut out = String::new();
    for identity in gallery.iter() {
        out.push_str(&format!("{}\t{}\n", identity.name, identity.descriptor.len()));
    }
    out.push_str(&format!("{} identities\n", gallery.len()));
    out
}
