use backlink_scope::core::enrichment::EnrichmentProgress;
use backlink_scope::utils::error::{BacklinkError, ErrorSeverity};
use backlink_scope::utils::{logger, validation::Validate};
use backlink_scope::{AnalysisEngine, BacklinkPipeline, CliConfig, LocalStorage};
use clap::Parser;
use std::io::{IsTerminal, Write};
use tokio::sync::mpsc::UnboundedReceiver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    if std::io::stderr().is_terminal() {
        logger::init_cli_logger(cli.verbose);
    } else {
        logger::init_json_logger();
    }

    tracing::info!("Starting backlink-scope");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.resolve().and_then(|run| run.validate().map(|_| run)) {
        Ok(run) => run,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e));
        }
    };

    let provider = match config.build_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("❌ Could not set up {} provider: {}", config.provider, e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    };

    let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel();
    let progress_task = tokio::spawn(render_progress(progress_rx));

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = BacklinkPipeline::new(storage, config, provider).with_progress(progress_tx);
    let engine = AnalysisEngine::new(pipeline);

    let result = engine.run().await;
    // The sender lives in the pipeline; dropping the engine ends the progress stream.
    drop(engine);
    let _ = progress_task.await;

    match result {
        Ok(outcome) => {
            tracing::info!("✅ Backlink analysis completed successfully!");
            println!("{}", outcome.report.render_text());
            println!("📁 Output saved to: {}", outcome.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Backlink analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

fn exit_code(e: &BacklinkError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

/// Single self-overwriting progress line on stderr.
async fn render_progress(mut rx: UnboundedReceiver<EnrichmentProgress>) {
    let mut shown = false;
    while let Some(event) = rx.recv().await {
        shown = true;
        eprint!(
            "\r🔗 Tier-2 analysis {}/{} ({:.0}%){}",
            event.completed,
            event.total,
            event.fraction() * 100.0,
            if event.degraded { " ⚠️" } else { "   " }
        );
        let _ = std::io::stderr().flush();
    }
    if shown {
        eprintln!();
    }
}
