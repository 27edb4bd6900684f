//! A full pitch session against the live services.
//!
//! Reads GOOGLE_API_KEY (and optionally HF_TOKEN plus the audio runtime
//! URLs) from the environment or a .env file, then generates proposals,
//! previews the first concept, renders its media and exports a PDF.
//!
//! Run with: `RUST_LOG=studio_core=debug cargo run -p studio-core --example pitch_session`

use std::time::Duration;
use studio_core::export::export_file_name;
use studio_core::{AppState, Category, Constraints, GenerationTask, Studio, TaskOutcome};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let studio = Studio::from_env();
    if !studio.engine().is_available() {
        eprintln!("GOOGLE_API_KEY is not set; nothing to do.");
        return Ok(());
    }

    let constraints = Constraints::new(
        "A night-shift ferry pilot smuggles memories between islands",
        3,
        6,
        10_000.0,
    )?;

    println!("1. Generating proposals...");
    let task = GenerationTask::spawn(studio.engine().clone(), constraints.clone());
    let set = match task
        .wait(Duration::from_secs(1), |elapsed| {
            println!("   ...{}s", elapsed.as_secs())
        })
        .await
    {
        TaskOutcome::Completed(result) => result?,
        TaskOutcome::Cancelled => return Ok(()),
    };

    let mut state = AppState::new();
    state.apply_proposals(set);
    for category in Category::ALL {
        println!("\n   {category}:");
        for item in state.pool.visible(category) {
            println!("   - {} ({})", item.name, item.estimated_cycle);
        }
    }

    let Some(first) = state.pool.visible(Category::Achievable).first().map(|i| i.id) else {
        println!("No achievable genres returned.");
        return Ok(());
    };
    state.select(Category::Achievable, first)?;
    state.accept_selected()?;

    println!("\n2. Rendering concept art...");
    match studio.image_for_selected(&mut state).await? {
        Some(bytes) => println!("   {} bytes", bytes.len()),
        None => println!("   unavailable"),
    }

    println!("\n3. Rendering soundtrack...");
    if let Some(bytes) = studio.soundtrack_for_selected(&mut state).await? {
        std::fs::write("soundtrack.wav", bytes)?;
        println!("   wrote soundtrack.wav");
    }

    println!("\n4. Exporting design document...");
    let pdf = studio.export_selected(&state, true).await?;
    let name = state
        .selected_item()
        .map(export_file_name)
        .unwrap_or_else(|| "design_GDD.pdf".to_string());
    std::fs::write(&name, pdf)?;
    println!("   wrote {name}");

    Ok(())
}
