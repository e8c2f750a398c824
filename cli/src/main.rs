//! Multiconv
//!
//! Command-line unit and currency converter.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use multiconv_common::{parse_value, ConverterError, Currency, UnitCategory};
use multiconv_fx::HttpRateProvider;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod output;
mod session;

use config::CliConfig;
use session::Session;

/// Multiconv CLI
#[derive(Parser, Debug)]
#[command(name = "multiconv")]
#[command(about = "Unit and currency converter with live exchange rates")]
struct Args {
    /// Exchange rate endpoint
    #[arg(long, global = true)]
    rates_url: Option<String>,

    /// Base currency for rate fetches
    #[arg(long, global = true)]
    base: Option<String>,

    /// Fetch timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a value between two units or currencies
    Convert {
        /// Value to convert
        #[arg(allow_negative_numbers = true, value_parser = parse_value)]
        value: f64,
        /// Source unit
        from: String,
        /// Target unit
        to: String,
        /// Swap source and target
        #[arg(short, long)]
        reverse: bool,
        /// Do not wait for rates when they are missing
        #[arg(long)]
        no_wait: bool,
    },
    /// List supported units
    Units {
        /// Only this category
        category: Option<UnitCategory>,
    },
    /// Fetch and print exchange rates
    Rates,
    /// Estimate travel time from distance and speed
    Eta {
        /// Distance
        #[arg(value_parser = parse_value)]
        distance: f64,
        /// Speed in distance units per second
        #[arg(value_parser = parse_value)]
        speed: f64,
    },
    /// Keep rates fresh and print status changes until Ctrl+C
    Watch {
        /// Refresh interval in seconds
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CliConfig::from_env();
    if let Some(url) = &args.rates_url {
        config.fx.endpoint = url.clone();
    }
    if let Some(base) = &args.base {
        config.fx.base_currency = Currency::new(base);
    }
    if let Some(ms) = args.timeout_ms {
        config.fx.fetch_timeout = Duration::from_millis(ms);
    }
    if let Command::Watch { interval_secs: Some(secs) } = &args.command {
        config.fx.refresh_interval = Duration::from_secs(*secs);
    }
    config.log_json |= args.log_json;
    config.validate()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(config.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!config.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    info!(endpoint = %config.fx.endpoint, base = %config.fx.base_currency, "Starting multiconv");

    let provider = Arc::new(HttpRateProvider::new(&config.fx.endpoint)?);
    let session = Session::new(provider, config.fx.clone());

    match args.command {
        Command::Convert { value, from, to, reverse, no_wait } => {
            let conversion = match session.convert(&from, &to, value, reverse, !no_wait).await {
                Ok(conversion) => conversion,
                Err(e) if is_rates_updating(&e) => {
                    println!("Currency rates are updating. Try again in a moment.");
                    info!(error = %e, "Conversion deferred");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&conversion)?);
            } else {
                println!("{}", output::conversion_line(&conversion));
            }
        }
        Command::Units { category } => {
            let groups = session.units(category);
            if args.json {
                let listing = groups
                    .iter()
                    .map(|(category, units)| (category.title(), *units))
                    .collect::<std::collections::BTreeMap<_, _>>();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("{}", output::units_listing(&groups));
            }
        }
        Command::Rates => {
            let base = config.fx.base_currency.clone();
            let rates = session.rates(base.clone()).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "base": base, "rates": rates }))?);
            } else {
                println!("{}", output::rates_listing(&base, &rates));
            }
        }
        Command::Eta { distance, speed } => {
            let eta = session.eta(distance, speed)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&eta)?);
            } else {
                println!("{}", eta);
            }
        }
        Command::Watch { .. } => {
            info!("Press Ctrl+C to stop");
            let json_output = args.json;
            let stop = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            session
                .watch(stop, |status| {
                    if json_output {
                        if let Ok(line) = serde_json::to_string(status) {
                            println!("{}", line);
                        }
                    } else {
                        println!("{}", output::status_line(status));
                    }
                })
                .await?;
        }
    }

    Ok(())
}

fn is_rates_updating(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<ConverterError>(), Some(ConverterError::RatesUpdating(_)))
}
