use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use embx_cli::{
    EXIT_ALL_FAILED, Settings, batch_exit_code, build_dispatcher, comparison_exit_code,
    init_tracing, provider_configs, provider_listing,
};
use embx_engine::{
    CompareOptions, DispatchOptions, EmbeddingParams, ProviderRegistry, ProviderTarget, RankBy,
    TruncationMode,
};
use tracing::error;

#[derive(Parser)]
#[command(name = "embx", version, about = "Embed text with several providers and compare them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed texts with one provider; prints one JSON result per line.
    Embed {
        /// Texts to embed. Read from stdin, one per line, when empty.
        texts: Vec<String>,
        #[arg(short, long, env = "EMBX_PROVIDER", default_value = "openai")]
        provider: String,
        #[arg(short, long)]
        model: Option<String>,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long)]
        no_cache: bool,
    },
    /// Embed one text with several providers and rank the outcomes.
    Compare {
        text: String,
        /// `provider` or `provider:model`; every provider when omitted.
        #[arg(short, long, value_delimiter = ',')]
        providers: Vec<ProviderTarget>,
        #[arg(long, default_value = "none")]
        rank_by: RankBy,
        #[arg(long)]
        only_configured: bool,
        #[arg(long)]
        hide_errors: bool,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        fail_fast: bool,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long)]
        no_cache: bool,
    },
    /// List known providers and whether they are configured.
    Providers,
}

#[derive(clap::Args)]
struct ParamArgs {
    /// Requested output dimension, for models that support it.
    #[arg(long)]
    dimensions: Option<usize>,
    #[arg(long, default_value = "auto", value_parser = parse_truncation)]
    truncation: TruncationMode,
}

impl ParamArgs {
    fn params(&self) -> EmbeddingParams {
        EmbeddingParams {
            dimensions: self.dimensions,
            truncation: self.truncation,
        }
    }
}

fn parse_truncation(s: &str) -> Result<TruncationMode, String> {
    [
        TruncationMode::Auto,
        TruncationMode::Disabled,
        TruncationMode::Start,
        TruncationMode::End,
    ]
    .into_iter()
    .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
    .ok_or_else(|| format!("'{s}' is not one of auto, disabled, start, end"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!(error = %err, "embx failed");
            let _ = writeln!(io::stderr().lock(), "error: {err:#}");
            ExitCode::from(EXIT_ALL_FAILED)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let settings = Settings::from_env();
    let configs = provider_configs(|k| std::env::var(k).ok(), settings.dispatcher.call_timeout);

    match cli.command {
        Command::Providers => {
            let registry = ProviderRegistry::from_configs(configs.clone())?;
            let listing = provider_listing(&configs, &registry);
            let mut out = io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &listing)?;
            writeln!(out)?;
            Ok(0)
        }
        Command::Embed {
            texts,
            provider,
            model,
            params,
            no_cache,
        } => {
            let texts = if texts.is_empty() { read_stdin_lines()? } else { texts };
            let dispatcher = build_dispatcher(&settings, configs)?;
            let options = DispatchOptions { use_cache: !no_cache };
            let results = dispatcher
                .embed_batch(&provider, model.as_deref(), &texts, params.params(), options)
                .await?;

            let mut out = io::stdout().lock();
            for result in &results {
                serde_json::to_writer(&mut out, result)?;
                writeln!(out)?;
            }
            Ok(batch_exit_code(&results))
        }
        Command::Compare {
            text,
            providers,
            rank_by,
            only_configured,
            hide_errors,
            top,
            fail_fast,
            params,
            no_cache,
        } => {
            let dispatcher = build_dispatcher(&settings, configs)?;
            let options = CompareOptions {
                rank_by,
                only_configured,
                include_errors: !hide_errors,
                top,
                use_cache: !no_cache,
                fail_fast,
            };
            let comparison = dispatcher
                .compare(&text, &providers, params.params(), &options)
                .await?;

            let mut out = io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &comparison)?;
            writeln!(out)?;
            Ok(comparison_exit_code(&comparison))
        }
    }
}

fn read_stdin_lines() -> anyhow::Result<Vec<String>> {
    let mut texts = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if !line.trim().is_empty() {
            texts.push(line);
        }
    }
    anyhow::ensure!(!texts.is_empty(), "no input texts given");
    Ok(texts)
}
