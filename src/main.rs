use anyhow::Context;
use clap::Parser;
use lookup_relay::config::cli::LogFormat;
use lookup_relay::utils::{logger, validation::Validate};
use lookup_relay::{
    CliConfig, ConfigProvider, EngineStats, HttpLookupClient, LookupEngine, QueryId,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting lookup-relay");

    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    let queries = if cli.queries.is_empty() {
        read_queries_from_stdin().await?
    } else {
        cli.queries.clone()
    };

    let client = HttpLookupClient::new(&config).context("building HTTP lookup client")?;
    let engine = LookupEngine::start(&config, client);

    let mut submitted: Vec<(QueryId, String)> = Vec::with_capacity(queries.len());
    for text in queries {
        let id = engine.submit(text.clone()).await?;
        println!("{}", submission_line(id, &text));
        submitted.push((id, text));
    }

    tokio::select! {
        _ = print_results(&engine, &submitted, &config) => {}
        _ = shutdown_signal() => {
            tracing::warn!("Received shutdown signal, no longer waiting for results");
        }
    }

    let stats = engine.shutdown(config.request_timeout()).await;
    println!("{}", summary_line(&stats));
    tracing::info!(
        submitted = stats.submitted,
        completed = stats.completed,
        dropped = stats.dropped,
        "lookup-relay finished"
    );

    Ok(())
}

async fn read_queries_from_stdin() -> anyhow::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut queries = Vec::new();
    while let Some(line) = lines.next_line().await.context("reading queries from stdin")? {
        let line = line.trim();
        if !line.is_empty() {
            queries.push(line.to_string());
        }
    }
    Ok(queries)
}

async fn print_results<P: ConfigProvider>(
    engine: &LookupEngine,
    submitted: &[(QueryId, String)],
    config: &P,
) {
    let ids: Vec<QueryId> = submitted.iter().map(|(id, _)| *id).collect();
    let outcomes = engine
        .wait_for_all(&ids, config.poll_interval(), config.poll_timeout())
        .await;

    for ((id, lines), (_, text)) in outcomes.into_iter().zip(submitted) {
        match lines {
            Some(lines) => {
                println!("[{}] {} ({} results)", id, text, lines.len());
                for line in lines {
                    println!("    {}", line);
                }
            }
            None => println!("[{}] {}: not found", id, text),
        }
    }
}

fn submission_line(id: QueryId, text: &str) -> String {
    serde_json::json!({ "id": id, "query": text }).to_string()
}

fn summary_line(stats: &EngineStats) -> String {
    serde_json::json!({ "stats": stats }).to_string()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
