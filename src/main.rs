use clap::Parser;
use colored::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use simulab::cli::{resolve_origin, Args};
use simulab::config::LabConfig;
use simulab::error::LabError;
use simulab::gateway::GeminiClient;
use simulab::pipeline::{PhaseEvent, PhaseStatus, SimulationPipeline};
use simulab::web;

#[tokio::main]
async fn main() -> Result<(), LabError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("simulab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = LabConfig::load()?;

    // Web UI mode
    if args.web {
        web::serve(args.port, &config).await?;
        return Ok(());
    }

    let Some(topic) = args.topic.clone() else {
        return Err(LabError::Config(
            "pass a topic, or --web to launch the lab UI".to_string(),
        ));
    };

    let origin = resolve_origin(args.origin.as_deref(), args.port);
    let gateway = GeminiClient::new(&config.gemini_api_key, &config.gemini_endpoint);

    let (tx, mut rx) = mpsc::unbounded_channel::<PhaseEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let line = format!("[{:>10}] {:<9} {:>3}%", event.phase, status_word(&event), event.progress);
            match event.status {
                PhaseStatus::Active => eprintln!("{}", line.bright_yellow()),
                PhaseStatus::Completed => eprintln!("{}", line.bright_green()),
                PhaseStatus::Error => eprintln!("{}", line.bright_red()),
                PhaseStatus::Pending => {}
            }
        }
    });

    let pipeline = SimulationPipeline::new(gateway, &origin).with_events(tx);
    let output = pipeline.run(&topic).await;
    // The pipeline holds the event sender; drop it so the printer drains out.
    drop(pipeline);
    let _ = printer.await;
    let output = output?;

    std::fs::write(&args.output, &output.artifact.html_code)?;
    eprintln!(
        "{} {}",
        "Processed simulation written to".bright_green(),
        args.output
    );
    if let Some(raw_path) = &args.raw_output {
        std::fs::write(raw_path, &output.raw_html)?;
        eprintln!("{} {}", "Raw variant written to".bright_green(), raw_path);
    }
    eprintln!("{}", "Concepts:".bright_blue());
    eprintln!("{}", output.artifact.concepts);

    Ok(())
}

fn status_word(event: &PhaseEvent) -> &'static str {
    match event.status {
        PhaseStatus::Pending => "pending",
        PhaseStatus::Active => "active",
        PhaseStatus::Completed => "completed",
        PhaseStatus::Error => "error",
    }
}
