use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from provider condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert a WeatherAPI condition code to a WeatherCondition
    /// See: https://www.weatherapi.com/docs/weather_conditions.json
    pub fn from_code(code: i32) -> Self {
        match code {
            1000 => Self::Clear,
            1003 => Self::PartlyCloudy,
            1006 | 1009 => Self::Cloudy,
            1030 | 1135 | 1147 => Self::Fog,
            1072 | 1150 | 1153 => Self::Drizzle,
            1168 | 1171 => Self::Sleet, // Freezing drizzle
            1063 | 1180 | 1183 | 1186 | 1189 | 1240 => Self::Rain,
            1192 | 1195 | 1243 | 1246 => Self::HeavyRain,
            1069 | 1198 | 1201 | 1204 | 1207 | 1249 | 1252 => Self::Sleet,
            1237 | 1261 | 1264 => Self::Sleet, // Ice pellets
            1066 | 1114 | 1117 | 1210 | 1213 | 1216 | 1219 | 1222 | 1225 | 1255 | 1258 => {
                Self::Snow
            }
            1087 | 1273 | 1276 | 1279 | 1282 => Self::Thunderstorm,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// A city suggestion, passed through from the provider unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    pub id: i64,
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub url: String,
}

/// Where a report applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    /// IANA timezone id, e.g. "Europe/Paris"
    pub timezone: String,
    /// Local wall-clock time at the location when the report was produced
    pub local_time: Option<String>,
}

/// Condition as reported, plus its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: i32,
    pub text: String,
    pub icon: String,
    pub kind: WeatherCondition,
}

/// Current weather conditions
///
/// Temperatures are whole degrees Celsius, wind speeds whole metres per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: LocationInfo,
    pub temperature: i32,
    pub feels_like: i32,
    pub humidity: u8,
    pub pressure: i32,
    pub wind_speed: i32,
    pub wind_degree: u16,
    pub wind_direction: String,
    pub cloud_cover: u8,
    pub visibility_km: f64,
    pub uv_index: f64,
    pub is_day: bool,
    pub condition: Condition,
    pub observed_at: DateTime<Utc>,
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temperature: i32,
    pub temp_min: i32,
    pub temp_max: i32,
    pub pressure: i32,
    pub humidity: u8,
    pub wind_speed: i32,
    pub chance_of_rain: u8,
    pub condition: Condition,
    pub sunrise: String,
    pub sunset: String,
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: NaiveDateTime,
    pub temperature: i32,
    pub feels_like: i32,
    pub humidity: u8,
    pub wind_speed: i32,
    pub chance_of_rain: u8,
    pub is_day: bool,
    pub condition: Condition,
}

/// One day of the hour-by-hour breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub hours: Vec<HourlyForecast>,
}

/// Multi-day forecast with both the flat daily list and per-day hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub location: LocationInfo,
    pub timezone: String,
    pub daily: Vec<DailyForecast>,
    pub days: Vec<ForecastDay>,
}

/// Current conditions and forecast fetched together for one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherBundle {
    pub current: WeatherSnapshot,
    pub forecast: ForecastBundle,
}

/// Monthly provider usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub count: u64,
    pub limit: u64,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_code_clear() {
        assert_eq!(WeatherCondition::from_code(1000), WeatherCondition::Clear);
    }

    #[test]
    fn test_code_clouds() {
        assert_eq!(WeatherCondition::from_code(1003), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_code(1006), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_code(1009), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_code_fog() {
        assert_eq!(WeatherCondition::from_code(1030), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_code(1135), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_code(1147), WeatherCondition::Fog);
    }

    #[test]
    fn test_code_rain() {
        assert_eq!(WeatherCondition::from_code(1063), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_code(1189), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_code(1195), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_code(1246), WeatherCondition::HeavyRain);
    }

    #[test]
    fn test_code_frozen() {
        assert_eq!(WeatherCondition::from_code(1168), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_code(1237), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_code(1225), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_code(1117), WeatherCondition::Snow);
    }

    #[test]
    fn test_code_thunder() {
        assert_eq!(WeatherCondition::from_code(1087), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_code(1282), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_unknown_code_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_code(0), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_code(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_condition_description_and_icon() {
        assert_eq!(WeatherCondition::HeavyRain.description(), "Heavy Rain");
    }

    #[test]
    fn test_city_result_url_is_optional() {
        let json = r#"{"id":1,"name":"London","region":"City of London","country":"UK","lat":51.52,"lon":-0.11}"#;
        let city: CitySearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(city.name, "London");
        assert!(city.url.is_empty());
    }
}
