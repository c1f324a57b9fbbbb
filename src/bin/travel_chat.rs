use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use travel_rag::db::TravelDataset;
use travel_rag::llm::factory::{EmbeddingProviderFactory, LlmProviderFactory};
use travel_rag::{ChatReply, TravelAssistant, TravelRagConfig};

#[derive(Parser)]
#[command(name = "travel-chat")]
#[command(about = "Ask travel questions answered from a vector index and a knowledge graph")]
struct Args {
    /// Serve this dataset from in-process stores instead of Pinecone and Neo4j
    #[arg(long, value_name = "DATASET_JSON")]
    local: Option<PathBuf>,

    /// Number of semantic matches per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Answer these questions and exit (repeatable)
    #[arg(long = "query", short = 'q')]
    queries: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "travel_rag=info".into()))
        .init();

    let mut config = TravelRagConfig::from_env();
    if let Some(top_k) = args.top_k {
        config.default_top_k = top_k;
    }
    config.validate()?;

    let assistant = match &args.local {
        Some(path) => {
            let dataset = TravelDataset::from_path(path)
                .await
                .with_context(|| format!("failed to load dataset {}", path.display()))?;
            let embedder = EmbeddingProviderFactory::from_config(&config)?;
            let llm = LlmProviderFactory::from_config(&config)?;
            TravelAssistant::local(&config, &dataset, embedder, llm).await?
        }
        None => TravelAssistant::from_config(&config)?,
    };

    if !args.queries.is_empty() {
        for reply in assistant.chat_many(args.queries).await {
            print_reply(&reply);
        }
        return Ok(());
    }

    println!("Vietnam Travel Chatbot");
    println!("{}", "=".repeat(50));
    println!("Ask me anything about Vietnam travel! Type 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nEnter your travel question: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        print_reply(&assistant.chat(query).await);
    }

    let stats = assistant.cache_stats();
    println!(
        "Goodbye! Cache size: {} embeddings, hit rate {:.0}%",
        stats.size,
        stats.hit_rate() * 100.0
    );
    Ok(())
}

fn print_reply(reply: &ChatReply) {
    println!("\nQ: {}", reply.query);
    if let Some(summary) = &reply.summary {
        println!("SUMMARY: {summary}");
    }
    if reply.degraded {
        println!("(related places unavailable, answer uses semantic matches only)");
    }
    println!("\nAssistant:\n{}", reply.answer);
    println!("{}", "=".repeat(50));
}
