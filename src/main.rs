//! Skycast: look up current weather and forecasts from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skycast_core::Config;
use skycast_weather::{
    ForecastBundle, SearchSession, SqliteUsageStore, WeatherError, WeatherService, WeatherSnapshot,
};

#[derive(Parser)]
#[command(name = "skycast", about = "City weather lookup", version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Suggest cities matching a partial name
    Search { query: String },
    /// Current conditions
    Current { city: String },
    /// Daily and hourly forecast
    Forecast {
        city: String,
        /// Also print the hour-by-hour breakdown
        #[arg(long)]
        hourly: bool,
    },
    /// Current conditions and forecast together
    Lookup { city: String },
    /// Provider calls used this month
    Usage,
}

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;
    let cli = Cli::parse();

    let (config, _warnings) = Config::load_validated(cli.config.as_deref())?;
    let store = SqliteUsageStore::new(config.usage_db_path())
        .with_context(|| format!("Failed to open {}", config.usage_db_path().display()))?;
    let service = Arc::new(WeatherService::from_config(&config.weather, Box::new(store))?);

    tracing::debug!("Skycast started with config dir {}", config.config_dir.display());

    let outcome = match cli.command {
        Command::Search { query } => {
            let cities = service.search_cities(&query).await;
            if cities.is_empty() {
                println!("No matching cities.");
            }
            for city in cities {
                println!(
                    "{}, {}, {} ({:.2}, {:.2})",
                    city.name, city.region, city.country, city.lat, city.lon
                );
            }
            Ok(())
        }
        Command::Current { city } => service
            .get_weather_data(&city)
            .await
            .map(|snapshot| print_current(&snapshot)),
        Command::Forecast { city, hourly } => service
            .get_forecast_data(&city)
            .await
            .map(|bundle| print_forecast(&bundle, hourly)),
        Command::Lookup { city } => {
            let session = SearchSession::new(service.clone(), config.weather.suggest_debounce());
            session.search(&city).await.map(|bundle| {
                print_current(&bundle.current);
                println!();
                print_forecast(&bundle.forecast, false);
            })
        }
        Command::Usage => {
            let usage = service.usage();
            println!(
                "API calls this month: {} / {} ({:.2}%)",
                usage.count, usage.limit, usage.percentage
            );
            Ok(())
        }
    };

    if let Err(e) = outcome {
        report(&e);
        std::process::exit(1);
    }

    Ok(())
}

fn report(error: &WeatherError) {
    tracing::error!("{}", error);
    eprintln!("{}", error.user_message());
}

fn print_current(snapshot: &WeatherSnapshot) {
    let location = &snapshot.location;
    println!("{}, {} ({})", location.name, location.country, location.timezone);
    println!(
        "  {}°C (feels like {}°C), {}",
        snapshot.temperature, snapshot.feels_like, snapshot.condition.text
    );
    println!(
        "  Wind {} m/s {}, humidity {}%, pressure {} hPa",
        snapshot.wind_speed, snapshot.wind_direction, snapshot.humidity, snapshot.pressure
    );
}

fn print_forecast(bundle: &ForecastBundle, hourly: bool) {
    println!("Forecast for {} ({})", bundle.location.name, bundle.timezone);
    for day in &bundle.daily {
        println!(
            "  {}  {:>3}°C / {:>3}°C  rain {:>3}%  {}",
            day.date,
            day.temp_min,
            day.temp_max,
            day.chance_of_rain,
            day.condition.kind.description()
        );
    }

    if !hourly {
        return;
    }
    for day in &bundle.days {
        println!("{}", day.date);
        for hour in &day.hours {
            println!(
                "  {}  {:>3}°C  wind {:>2} m/s  {}",
                hour.time.format("%H:%M"),
                hour.temperature,
                hour.wind_speed,
                hour.condition.text
            );
        }
    }
}
