//! airwise CLI: typed utterances and route requests against the live services.
//!
//! Usage:
//!   airwise "check Mumbai"
//!   airwise --start Delhi --end Gurgaon --avoid-high-aqi
//!   airwise                     (reads one utterance per line from stdin)
//!
//! Credentials come from WAQI_TOKEN and OPENROUTE_API_KEY or the config file.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use airwise::cache::{CachedAqiLookup, CachedGeocoder};
use airwise::config::AppConfig;
use airwise::interpreter::{Interpreter, VoiceContext, VoiceOutcome};
use airwise::model::{Coordinates, ScoredRoute};
use airwise::nominatim::NominatimClient;
use airwise::openroute::OpenRouteClient;
use airwise::session::VoiceSession;
use airwise::traits::SpeechSink;
use airwise::waqi::WaqiClient;

#[derive(Parser)]
#[command(author, version, about = "Air-quality-aware routes and voice commands", long_about = None)]
struct CliArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// route start; requires --end
    #[arg(long, requires = "end")]
    start: Option<String>,
    /// route destination; requires --start
    #[arg(long, requires = "start")]
    end: Option<String>,
    #[arg(long)]
    avoid_high_aqi: bool,
    #[arg(long)]
    balance: bool,
    /// extra minutes over the fastest route allowed when balancing
    #[arg(long)]
    max_extra_minutes: Option<f64>,
    /// device latitude, used by "locate me"
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,
    /// device longitude, used by "locate me"
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,
    /// utterance to interpret; stdin is read when omitted
    utterance: Vec<String>,
}

/// Playback stand-in: spoken replies go to the log.
struct LogSpeech;

impl SpeechSink for LogSpeech {
    fn speak(&self, text: &str) {
        info!(reply = text, "speaking");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("airwise=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.preferences.avoid_high_aqi |= args.avoid_high_aqi;
    config.preferences.balance_aqi_and_time |= args.balance;
    if let Some(extra) = args.max_extra_minutes {
        config.preferences.max_additional_time_min = extra;
    }
    airwise::scoring::validate(&config.preferences)?;

    let geocoder =
        CachedGeocoder::from_config(NominatimClient::new(config.nominatim.clone())?, &config.cache);
    let aqi = CachedAqiLookup::from_config(WaqiClient::new(config.waqi.clone())?, &config.cache);
    let routes = OpenRouteClient::new(config.openroute.clone(), &aqi, &geocoder)?;

    let mut context = VoiceContext::new(config.preferences);
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        context.device_position = Some(Coordinates::new(lat, lng));
    }
    let interpreter = Interpreter::new(&geocoder, &aqi, &routes);
    let mut session = VoiceSession::new(interpreter, LogSpeech, context);

    if let (Some(start), Some(end)) = (args.start.as_deref(), args.end.as_deref()) {
        let ranked = session.plan_routes(start, end)?;
        print_routes(ranked);
        return Ok(());
    }

    if !args.utterance.is_empty() {
        let outcome = session.handle_utterance(&args.utterance.join(" "));
        print_outcome(&outcome);
        return match outcome.error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        };
    }

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let outcome = session.handle_utterance(&line);
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &VoiceOutcome) {
    println!("{}", outcome.reply);
    if let Some(reading) = &outcome.reading {
        for (code, value) in &reading.components {
            println!("  {:>5}: {}", code.to_uppercase(), value);
        }
    }
    if let Some(routes) = &outcome.routes {
        print_routes(routes);
    }
    if let Some(err) = &outcome.error {
        eprintln!("error: {}", err);
    }
}

fn print_routes(routes: &[ScoredRoute]) {
    for scored in routes {
        let aqi = if scored.has_aqi() {
            format!("{:.1} ({})", scored.aqi_score, scored.category())
        } else {
            "n/a".to_string()
        };
        println!(
            "#{} {} {} -> {}: {:.1} km, {:.1} min, AQI {}",
            scored.rank,
            scored.route.variant.as_deref().unwrap_or(&scored.route.id),
            scored.route.start_label,
            scored.route.end_label,
            scored.route.distance_km,
            scored.route.duration_min,
            aqi
        );
        let via: Vec<&str> = scored
            .route
            .waypoint_locations
            .iter()
            .map(|place| place.name.as_str())
            .collect();
        if !via.is_empty() {
            println!("    via {}", via.join(", "));
        }
    }
}
