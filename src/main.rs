use clap::{Arg, Command};
use log::LevelFilter;
use phoneblock_screen::normalization::{normalize_with_country_code, LookupCandidates};
use phoneblock_screen::{CallContext, CallScreener, LoggingCall, ScreenerConfig};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("phoneblock-screen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Screens inbound calls against the PhoneBlock number reputation service")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phoneblock-screen.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .value_name("NUMBER")
                .help("Screen a single call from NUMBER")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("did")
                .long("did")
                .value_name("DID")
                .help("Called number for --check")
                .default_value(""),
        )
        .arg(
            Arg::new("outbound")
                .long("outbound")
                .help("Treat the --check call as outbound")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the --check outcome as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("normalize")
                .long("normalize")
                .value_name("NUMBER")
                .help("Show the normalized number and lookup candidates (no network)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/phoneblock-screen.yaml");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if let Some(number) = matches.get_one::<String>("normalize") {
        let e164 = normalize_with_country_code(number, &config.country_code);
        println!("Input:      {number}");
        println!("Normalized: {}", if e164.is_empty() { "(none)" } else { e164.as_str() });
        for (i, candidate) in LookupCandidates::with_country_code(&e164, &config.country_code)
            .enumerate()
        {
            println!("Candidate {}: {candidate}", i + 1);
        }
        return;
    }

    if matches.get_flag("test-config") {
        let screener = match CallScreener::from_config(&config) {
            Ok(screener) => screener,
            Err(e) => {
                eprintln!("Configuration rejected: {e}");
                process::exit(1);
            }
        };
        let engine = screener.engine();
        let ratings = engine.negative_ratings();
        let channels = screener.dispatcher().channel_names();

        println!("Checking configuration...");
        println!();
        println!("API base: {}", config.api_base);
        println!(
            "Bearer token: {}",
            if config.bearer_token.is_empty() { "missing" } else { "set" }
        );
        println!("Block threshold: {} votes", engine.min_votes());
        if ratings.is_empty() {
            println!("Negative ratings: none (nothing will be blocked)");
        } else {
            println!(
                "Negative ratings ({}): {}",
                ratings.len(),
                ratings.sorted().join(", ")
            );
        }
        println!("HTTP timeout: {}s", config.http_timeout_seconds);
        if channels.is_empty() {
            println!("Notification channels: none");
        } else {
            println!("Notification channels: {}", channels.join(", "));
        }
        println!("Configuration OK.");
        return;
    }

    if let Some(number) = matches.get_one::<String>("check") {
        let screener = match CallScreener::from_config(&config) {
            Ok(screener) => screener,
            Err(e) => {
                eprintln!("Error creating screener: {e}");
                process::exit(1);
            }
        };

        let ctx = CallContext {
            caller_id: number.clone(),
            called_number: matches
                .get_one::<String>("did")
                .cloned()
                .unwrap_or_default(),
            is_inbound: !matches.get_flag("outbound"),
        };

        let call = LoggingCall::new();
        let outcome = screener.screen_call(&ctx, &call).await;

        if matches.get_flag("json") {
            match serde_json::to_string_pretty(&outcome) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error encoding outcome: {e}");
                    process::exit(1);
                }
            }
        } else {
            println!("Result: {}", outcome.state.as_str().to_uppercase());
            println!("   Number: {}", outcome.number);
            println!("   Votes: {}", outcome.votes);
            println!("   Rating: {}", outcome.rating);
            println!("   Call terminated: {}", call.was_terminated());
        }
        return;
    }

    eprintln!("Nothing to do. Use --check NUMBER, --normalize NUMBER or --test-config.");
    process::exit(2);
}

fn load_config(path: &str) -> anyhow::Result<ScreenerConfig> {
    let mut config = if std::path::Path::new(path).exists() {
        ScreenerConfig::from_file(path)?
    } else {
        log::warn!("No config at '{path}', falling back to built-in defaults");
        ScreenerConfig::default()
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn generate_default_config(path: &str) {
    let config = ScreenerConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Wrote starter configuration to {path}");
            println!("Set bearer_token (or PHONEBLOCK_API_TOKEN) and any webhook URLs before use.");
        }
        Err(e) => {
            eprintln!("Could not write {path}: {e}");
            process::exit(1);
        }
    }
}
