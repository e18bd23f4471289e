//! micpost: record from the microphone, listen back, and upload each take.

mod app;
mod commands;
mod config;
mod logging;
mod playback;
mod recording;
mod upload;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
