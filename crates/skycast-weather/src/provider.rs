//! WeatherAPI.com response payloads and their normalization.
//!
//! Only the fields the normalized types need are modelled; anything else in
//! the provider JSON is ignored.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::WeatherError;
use crate::types::{
    Condition, DailyForecast, ForecastBundle, ForecastDay, HourlyForecast, LocationInfo,
    WeatherCondition, WeatherSnapshot,
};

/// Daily payloads carry no pressure
pub const PLACEHOLDER_PRESSURE_MB: i32 = 1013;
pub const PLACEHOLDER_HUMIDITY: u8 = 0;
pub const PLACEHOLDER_WIND_KPH: f64 = 0.0;

const HOUR_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Round to the nearest integer, halves toward positive infinity (-2.5 -> -2).
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Convert km/h to whole m/s.
pub fn kph_to_ms(kph: f64) -> i32 {
    round_half_up(kph / 3.6)
}

/// Body of a non-2xx provider response: `{"error":{"code":1006,"message":"..."}}`
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDetail {
    pub code: Option<i64>,
    pub message: Option<String>,
}

impl ProviderErrorBody {
    /// Provider message from a raw error body, if it has a non-empty one.
    pub fn parse(body: &str) -> Option<(Option<i64>, String)> {
        let parsed: ProviderErrorBody = serde_json::from_str(body).ok()?;
        let message = parsed.error.message.filter(|m| !m.trim().is_empty())?;
        Some((parsed.error.code, message))
    }
}

#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tz_id: String,
    pub localtime: Option<String>,
}

impl From<RawLocation> for LocationInfo {
    fn from(raw: RawLocation) -> Self {
        Self {
            name: raw.name,
            region: raw.region,
            country: raw.country,
            lat: raw.lat,
            lon: raw.lon,
            timezone: raw.tz_id,
            local_time: raw.localtime,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub code: i32,
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        // Icons come protocol-relative ("//cdn.weatherapi.com/...")
        let icon = if raw.icon.starts_with("//") {
            format!("https:{}", raw.icon)
        } else {
            raw.icon
        };
        Self {
            kind: WeatherCondition::from_code(raw.code),
            code: raw.code,
            text: raw.text,
            icon,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawCurrent {
    #[serde(default)]
    pub last_updated_epoch: i64,
    pub temp_c: f64,
    pub feelslike_c: Option<f64>,
    #[serde(default)]
    pub is_day: u8,
    #[serde(default)]
    pub condition: RawCondition,
    pub wind_kph: f64,
    #[serde(default)]
    pub wind_degree: u16,
    #[serde(default)]
    pub wind_dir: String,
    #[serde(default)]
    pub pressure_mb: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub cloud: u8,
    #[serde(default)]
    pub vis_km: f64,
    #[serde(default)]
    pub uv: f64,
}

/// `current.json`
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub location: RawLocation,
    pub current: RawCurrent,
}

impl CurrentResponse {
    pub fn into_snapshot(self) -> WeatherSnapshot {
        let current = self.current;
        WeatherSnapshot {
            location: self.location.into(),
            temperature: round_half_up(current.temp_c),
            feels_like: round_half_up(current.feelslike_c.unwrap_or(current.temp_c)),
            humidity: current.humidity,
            pressure: round_half_up(current.pressure_mb),
            wind_speed: kph_to_ms(current.wind_kph),
            wind_degree: current.wind_degree,
            wind_direction: current.wind_dir,
            cloud_cover: current.cloud,
            visibility_km: current.vis_km,
            uv_index: current.uv,
            is_day: current.is_day != 0,
            condition: current.condition.into(),
            observed_at: DateTime::from_timestamp(current.last_updated_epoch, 0)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawDay {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub avgtemp_c: f64,
    pub maxwind_kph: Option<f64>,
    pub avghumidity: Option<f64>,
    #[serde(default)]
    pub daily_chance_of_rain: u8,
    #[serde(default)]
    pub condition: RawCondition,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawAstro {
    #[serde(default)]
    pub sunrise: String,
    #[serde(default)]
    pub sunset: String,
}

#[derive(Debug, Deserialize)]
pub struct RawHour {
    pub time: String,
    pub temp_c: f64,
    pub feelslike_c: Option<f64>,
    #[serde(default)]
    pub is_day: u8,
    #[serde(default)]
    pub condition: RawCondition,
    #[serde(default)]
    pub wind_kph: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub chance_of_rain: u8,
}

impl RawHour {
    fn into_hourly(self) -> Result<HourlyForecast, WeatherError> {
        let time = NaiveDateTime::parse_from_str(&self.time, HOUR_TIME_FORMAT)
            .map_err(|e| WeatherError::Parse(format!("hour time {:?}: {}", self.time, e)))?;
        Ok(HourlyForecast {
            time,
            temperature: round_half_up(self.temp_c),
            feels_like: round_half_up(self.feelslike_c.unwrap_or(self.temp_c)),
            humidity: self.humidity,
            wind_speed: kph_to_ms(self.wind_kph),
            chance_of_rain: self.chance_of_rain,
            is_day: self.is_day != 0,
            condition: self.condition.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawForecastDay {
    pub date: NaiveDate,
    pub day: Option<RawDay>,
    #[serde(default)]
    pub astro: RawAstro,
    pub hour: Option<Vec<RawHour>>,
}

#[derive(Debug, Deserialize)]
pub struct RawForecast {
    pub forecastday: Option<Vec<RawForecastDay>>,
}

/// `forecast.json`
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub location: RawLocation,
    pub forecast: Option<RawForecast>,
}

impl ForecastResponse {
    /// Normalize into a [`ForecastBundle`].
    ///
    /// Every day must carry its `day` summary and the first day must carry an
    /// hourly breakdown; later days without one get an empty hour list.
    pub fn into_bundle(self) -> Result<ForecastBundle, WeatherError> {
        let forecast_days = self
            .forecast
            .and_then(|f| f.forecastday)
            .filter(|days| days.first().is_some_and(|d| d.hour.is_some()))
            .ok_or(WeatherError::InvalidForecastData)?;

        let location: LocationInfo = self.location.into();
        let mut daily = Vec::with_capacity(forecast_days.len());
        let mut days = Vec::with_capacity(forecast_days.len());

        for raw in forecast_days {
            let day = raw.day.ok_or(WeatherError::InvalidForecastData)?;
            daily.push(DailyForecast {
                date: raw.date,
                temperature: round_half_up(day.avgtemp_c),
                temp_min: round_half_up(day.mintemp_c),
                temp_max: round_half_up(day.maxtemp_c),
                pressure: PLACEHOLDER_PRESSURE_MB,
                humidity: day
                    .avghumidity
                    .map(|h| round_half_up(h).clamp(0, 100) as u8)
                    .unwrap_or(PLACEHOLDER_HUMIDITY),
                wind_speed: kph_to_ms(day.maxwind_kph.unwrap_or(PLACEHOLDER_WIND_KPH)),
                chance_of_rain: day.daily_chance_of_rain,
                condition: day.condition.into(),
                sunrise: raw.astro.sunrise,
                sunset: raw.astro.sunset,
            });

            let hours = raw
                .hour
                .unwrap_or_default()
                .into_iter()
                .map(RawHour::into_hourly)
                .collect::<Result<Vec<_>, _>>()?;
            days.push(ForecastDay {
                date: raw.date,
                hours,
            });
        }

        Ok(ForecastBundle {
            timezone: location.timezone.clone(),
            location,
            daily,
            days,
        })
    }
}
