//! tapi - tweet rendering CLI
//!
//! Main entry point for the tapi command-line tool.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use serde_json::{Value, json};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use tapi::cli::{AgeArgs, CompletionsArgs, ConfigArgs, LoopArgs, RenderArgs};
use tapi::{
    CachedApi, Cli, Commands, Config, MemoryApi, OutputFormat, TapiError, TimestampFormat, Tweet,
    TweetCollection, TweetStore, VALID_CONFIG_KEYS, format_age, format_error, format_relative_time,
    format_tapi_error, init_cli_logging, into_tweet_values, parse_twitter_date,
};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        match err.downcast_ref::<TapiError>() {
            Some(tapi_err) => eprintln!("{}", format_tapi_error(tapi_err)),
            None => eprintln!("{}", format_error(&format!("{err:#}"), "", &[])),
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_with_file(path)?,
        None => Config::load(),
    };
    if !config.output.colors {
        colored::control::set_override(false);
    }
    init_cli_logging(cli.quiet, cli.verbose, config.output.colors);

    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::from_config(&config.output.format));

    match &cli.command {
        Commands::Render(args) => cmd_render(&config, format, args),
        Commands::Loop(args) => cmd_loop(&config, format, args),
        Commands::Age(args) => cmd_age(format, args),
        Commands::Config(args) => cmd_config(&config, format, args),
        Commands::Completions(args) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

/// Offline store: every tweet comes from the input, nothing is fetched.
fn open_store(config: &Config) -> TweetStore {
    let api = CachedApi::new(MemoryApi::new(), config.response_ttl());
    TweetStore::from_config(Arc::new(api), config)
}

fn read_input(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read tweets from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    debug!(bytes = content.len(), "Read input");
    Ok(value)
}

fn load_tweets(store: &TweetStore, path: &Path) -> Result<Vec<Arc<Tweet>>> {
    let values = into_tweet_values(read_input(path)?);
    let total = values.len();
    let tweets: Vec<_> = values
        .into_iter()
        .map(|value| store.wrap_value(value))
        .filter(|tweet| tweet.is_verified())
        .collect();
    if tweets.len() < total {
        warn!(skipped = total - tweets.len(), "Skipped entries that are not tweets");
    }
    Ok(tweets)
}

fn tweet_json(tweet: &Tweet, text: &str, now: DateTime<Utc>) -> Value {
    json!({
        "id": tweet.id_str(),
        "screen_name": tweet.author_screen_name().ok(),
        "permalink": tweet.permalink().ok(),
        "created_at": tweet.timestamp_at(&TimestampFormat::Raw, now).ok(),
        "age": tweet.age_at(now).ok(),
        "text": text,
        "media": tweet.media_urls(),
    })
}

fn print_json(value: &Value, format: OutputFormat) -> Result<()> {
    let out = if format == OutputFormat::JsonPretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn cmd_render(config: &Config, format: OutputFormat, args: &RenderArgs) -> Result<()> {
    let store = open_store(config);
    let tweets = load_tweets(&store, &args.input)?;
    let now = Utc::now();

    let mut rendered = Vec::with_capacity(tweets.len());
    for tweet in &tweets {
        let text = if args.raw {
            tweet.raw_text()?.to_string()
        } else if args.linkify {
            tweet.linked_full_text()?
        } else {
            tweet.rendered_text()?.to_string()
        };
        rendered.push(text);
    }

    match format {
        OutputFormat::Text => {
            for text in &rendered {
                println!("{text}");
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let out: Vec<Value> = tweets
                .iter()
                .zip(&rendered)
                .map(|(tweet, text)| tweet_json(tweet, text, now))
                .collect();
            print_json(&Value::Array(out), format)?;
        }
    }
    Ok(())
}

fn cmd_loop(config: &Config, format: OutputFormat, args: &LoopArgs) -> Result<()> {
    let store = open_store(config);
    let mut collection = TweetCollection::new(load_tweets(&store, &args.input)?);
    let limit = args.limit.unwrap_or(usize::MAX);
    let now = Utc::now();

    if collection.is_empty() {
        if format == OutputFormat::Text {
            println!("{}", "No tweets.".yellow());
        } else {
            print_json(&Value::Array(Vec::new()), format)?;
        }
        return Ok(());
    }

    let mut out = Vec::new();
    let mut shown = 0;
    while shown < limit && collection.has_next() {
        let Some(tweet) = collection.advance() else {
            break;
        };
        shown += 1;

        if format != OutputFormat::Text {
            out.push(tweet_json(&tweet, tweet.rendered_text()?, now));
            continue;
        }

        let author = tweet
            .author_screen_name()
            .map_or_else(|_| "unknown".to_string(), |name| format!("@{name}"));
        let age = tweet.age_at(now).unwrap_or_else(|_| "?".to_string());
        println!(
            "{} {} {} {}",
            format!("{}.", collection.position().map_or(0, |p| p + 1)).dimmed(),
            author.bold(),
            "·".dimmed(),
            age.dimmed()
        );
        if let Some(original) = tweet.retweeted_status() {
            let from = original
                .author_screen_name()
                .map_or_else(|_| String::new(), |name| format!(" @{name}"));
            println!("   {}", format!("retweeted{from}").cyan());
        }
        for line in textwrap::wrap(tweet.raw_text()?, args.width) {
            println!("   {line}");
        }
        for url in tweet.media_urls() {
            println!("   {}", url.blue());
        }
        println!();
    }

    if format != OutputFormat::Text {
        print_json(&Value::Array(out), format)?;
    }
    Ok(())
}

fn cmd_age(format: OutputFormat, args: &AgeArgs) -> Result<()> {
    let created = parse_twitter_date(&args.created_at)
        .ok_or_else(|| TapiError::invalid_date(&args.created_at, "argument"))?;
    let now = Utc::now();
    let text = if args.relative {
        format_relative_time(created, now)
    } else {
        format_age(created, now)
    };

    match format {
        OutputFormat::Text => println!("{text}"),
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(
            &json!({"created_at": created.to_rfc3339(), "age": text}),
            format,
        )?,
    }
    Ok(())
}

fn cmd_config(config: &Config, format: OutputFormat, args: &ConfigArgs) -> Result<()> {
    if args.path {
        let path = Config::user_config_path().context("Could not determine config directory")?;
        println!("{}", path.display());
        return Ok(());
    }

    if args.init {
        let path = Config::user_config_path().context("Could not determine config directory")?;
        if path.exists() {
            println!("{} Config already exists at {}", "!".yellow(), path.display());
        } else {
            Config::default().save_to(&path)?;
            println!("{} Wrote {}", "✓".green(), path.display());
        }
        return Ok(());
    }

    if let Some(key) = &args.get {
        let value = config.get_value(key).ok_or_else(|| {
            TapiError::invalid_argument(format!(
                "unknown config key '{key}' (valid keys: {})",
                VALID_CONFIG_KEYS.join(", ")
            ))
        })?;
        println!("{value}");
        return Ok(());
    }

    match format {
        OutputFormat::Text => {
            println!("{}", "Current Configuration".bold().cyan());
            print!("{}", toml::to_string_pretty(config)?);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            print_json(&serde_json::to_value(config)?, format)?;
        }
    }
    Ok(())
}

fn cmd_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "tapi", &mut io::stdout());
}
