// sources/weather.rs — Open-Meteo geocoding + forecast

use super::{
    read_json, Coordinates, CurrentConditions, DailyForecast, HourlyForecast, PrecipitationTotals,
    Rainfall, SourceError, SourceOrigin, SourcePayload, SourceResult, WeatherReport, WeatherSource,
};
use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const HOURLY_HOURS: usize = 24;
const DAILY_DAYS: usize = 7;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,\
rain,showers,snowfall,weather_code,wind_speed_10m,wind_direction_10m,pressure_msl";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,precipitation,precipitation_probability,\
rain,showers,snowfall,weather_code,wind_speed_10m,wind_direction_10m";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,rain_sum,showers_sum,\
snowfall_sum,precipitation_hours,precipitation_probability_max,weather_code";

/// WMO weather interpretation code to a short phrase.
pub fn weather_description(code: i64) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "foggy",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "slight snow",
        73 => "moderate snow",
        75 => "heavy snow",
        77 => "snow grains",
        80 => "slight rain showers",
        81 => "moderate rain showers",
        82 => "violent rain showers",
        85 => "slight snow showers",
        86 => "heavy snow showers",
        95 => "thunderstorm",
        96 => "thunderstorm with slight hail",
        99 => "thunderstorm with heavy hail",
        _ => "unknown",
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Clone, Deserialize)]
struct Place {
    latitude: f64,
    longitude: f64,
    name: String,
    #[serde(default)]
    country: String,
}

impl Place {
    fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

pub struct WeatherClient {
    client: Client,
    forecast_url: String,
    geocoding_url: String,
}

impl WeatherClient {
    pub fn new(forecast_url: String, geocoding_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            forecast_url,
            geocoding_url,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.open_meteo_url.clone(),
            config.geocoding_url.clone(),
            config.source_timeout(),
        )
    }

    async fn geocode(&self, location: &str) -> Result<Place, SourceError> {
        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("name", location),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?;
        let body: GeocodingResponse = read_json(response).await?;

        body.results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::LocationNotFound(location.to_string()))
    }

    async fn forecast(&self, place: &Place) -> Result<Value, SourceError> {
        let latitude = place.latitude.to_string();
        let longitude = place.longitude.to_string();
        let forecast_days = DAILY_DAYS.to_string();

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", CURRENT_FIELDS),
                ("hourly", HOURLY_FIELDS),
                ("daily", DAILY_FIELDS),
                ("timezone", "auto"),
                ("forecast_days", forecast_days.as_str()),
            ])
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch(&self, location: &str) -> Result<WeatherReport, SourceError> {
        let place = self.geocode(location).await?;
        tracing::debug!(
            "Weather: '{}' resolved to {} ({}, {})",
            location,
            place.label(),
            place.latitude,
            place.longitude
        );

        let forecast = self.forecast(&place).await?;
        build_report(
            place.label(),
            Coordinates {
                latitude: place.latitude,
                longitude: place.longitude,
            },
            &forecast,
        )
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn weather(&self, location: &str) -> SourceResult {
        match self.fetch(location).await {
            Ok(report) => {
                SourceResult::live(SourceOrigin::OpenMeteo, SourcePayload::Weather(report))
            }
            Err(e) => {
                tracing::warn!("Weather: lookup for '{}' failed: {}", location, e);
                let error = e.to_string();
                let message =
                    format!("Unable to fetch weather data for \"{}\". {}", location, error);
                SourceResult::failed(SourceOrigin::OpenMeteo, error, message)
            }
        }
    }
}

/// Shape a forecast response. Missing series entries read as 0.
fn build_report(
    location: String,
    coordinates: Coordinates,
    forecast: &Value,
) -> Result<WeatherReport, SourceError> {
    let current = forecast
        .get("current")
        .filter(|v| v.is_object())
        .ok_or_else(|| SourceError::Parse("missing current conditions".to_string()))?;
    let hourly = forecast
        .get("hourly")
        .filter(|v| v.is_object())
        .ok_or_else(|| SourceError::Parse("missing hourly series".to_string()))?;
    let daily = forecast.get("daily").unwrap_or(&Value::Null);

    let current_totals = PrecipitationTotals {
        precipitation: number(current, "precipitation"),
        rain: number(current, "rain"),
        showers: number(current, "showers"),
    };

    let conditions = CurrentConditions {
        temperature: number(current, "temperature_2m"),
        feels_like: number(current, "apparent_temperature"),
        humidity: number(current, "relative_humidity_2m"),
        pressure: number(current, "pressure_msl"),
        description: weather_description(code(current.get("weather_code"))).to_string(),
        wind_speed: number(current, "wind_speed_10m"),
        wind_direction: number(current, "wind_direction_10m"),
        precipitation: current_totals.precipitation,
        rain: current_totals.rain,
        showers: current_totals.showers,
        snowfall: number(current, "snowfall"),
    };

    let hours = series_len(hourly).min(HOURLY_HOURS);
    let hourly_forecast: Vec<HourlyForecast> = (0..hours)
        .map(|i| HourlyForecast {
            datetime: time_at(hourly, i),
            temp: at(hourly, "temperature_2m", i),
            description: weather_description(code(series_entry(hourly, "weather_code", i)))
                .to_string(),
            humidity: at(hourly, "relative_humidity_2m", i),
            precipitation: at(hourly, "precipitation", i),
            precipitation_probability: at(hourly, "precipitation_probability", i),
            rain: at(hourly, "rain", i),
            showers: at(hourly, "showers", i),
            snowfall: at(hourly, "snowfall", i),
            wind_speed: at(hourly, "wind_speed_10m", i),
        })
        .collect();

    let days = series_len(daily).min(DAILY_DAYS);
    let daily_forecast: Vec<DailyForecast> = (0..days)
        .map(|i| {
            let weather_code = code(series_entry(daily, "weather_code", i));
            DailyForecast {
                date: time_at(daily, i),
                temp_max: at(daily, "temperature_2m_max", i),
                temp_min: at(daily, "temperature_2m_min", i),
                precipitation_sum: at(daily, "precipitation_sum", i),
                rain_sum: at(daily, "rain_sum", i),
                showers_sum: at(daily, "showers_sum", i),
                snowfall_sum: at(daily, "snowfall_sum", i),
                precipitation_hours: at(daily, "precipitation_hours", i),
                precipitation_probability_max: at(daily, "precipitation_probability_max", i),
                weather_code,
                description: weather_description(weather_code).to_string(),
            }
        })
        .collect();

    // Open-Meteo hourly series start at local midnight, so the first 24
    // entries are both "today" and the next-24h window.
    let totals = PrecipitationTotals {
        precipitation: round2(hourly_forecast.iter().map(|h| h.precipitation).sum()),
        rain: round2(hourly_forecast.iter().map(|h| h.rain).sum()),
        showers: round2(hourly_forecast.iter().map(|h| h.showers).sum()),
    };

    Ok(WeatherReport {
        location,
        coordinates,
        current: conditions,
        rainfall: Rainfall {
            current: current_totals,
            today: totals.clone(),
            next_24h: totals,
            unit: "mm",
        },
        hourly_forecast,
        daily_forecast,
    })
}

fn series_len(block: &Value) -> usize {
    block
        .get("time")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn series_entry<'a>(block: &'a Value, key: &str, index: usize) -> Option<&'a Value> {
    block.get(key)?.as_array()?.get(index)
}

fn at(block: &Value, key: &str, index: usize) -> f64 {
    series_entry(block, key, index)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn time_at(block: &Value, index: usize) -> String {
    series_entry(block, "time", index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number(block: &Value, key: &str) -> f64 {
    block.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn code(value: Option<&Value>) -> i64 {
    value
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paris() -> Coordinates {
        Coordinates {
            latitude: 48.85,
            longitude: 2.35,
        }
    }

    fn forecast_with_hours(hours: usize) -> Value {
        let times: Vec<String> = (0..hours).map(|h| format!("2025-06-01T{:02}:00", h)).collect();
        json!({
            "current": {
                "temperature_2m": 21.4,
                "apparent_temperature": 20.9,
                "relative_humidity_2m": 55,
                "pressure_msl": 1016.2,
                "weather_code": 61,
                "wind_speed_10m": 12.5,
                "precipitation": 0.4,
                "rain": 0.4,
                "showers": 0.0,
                "snowfall": 0.0
            },
            "hourly": {
                "time": times,
                "temperature_2m": vec![18.0; hours],
                "relative_humidity_2m": vec![60; hours],
                "precipitation": vec![0.112; hours],
                "rain": vec![0.1; hours],
                "weather_code": vec![3; hours]
            },
            "daily": {
                "time": ["2025-06-01", "2025-06-02"],
                "temperature_2m_max": [24.0, 26.5],
                "temperature_2m_min": [14.0],
                "weather_code": [95, 1]
            }
        })
    }

    #[test]
    fn describes_known_and_unknown_codes() {
        assert_eq!(weather_description(0), "clear sky");
        assert_eq!(weather_description(82), "violent rain showers");
        assert_eq!(weather_description(99), "thunderstorm with heavy hail");
        assert_eq!(weather_description(42), "unknown");
    }

    #[test]
    fn builds_report_from_forecast() {
        let report =
            build_report("Paris, France".into(), paris(), &forecast_with_hours(48)).unwrap();

        assert_eq!(report.location, "Paris, France");
        assert_eq!(report.current.description, "slight rain");
        assert_eq!(report.current.humidity, 55.0);
        // wind_direction_10m absent from the fixture
        assert_eq!(report.current.wind_direction, 0.0);
        assert_eq!(report.rainfall.current.rain, 0.4);
        assert_eq!(report.hourly_forecast.len(), 24);
        assert_eq!(report.hourly_forecast[0].description, "overcast");
        assert_eq!(report.hourly_forecast[5].showers, 0.0);
        assert_eq!(report.rainfall.today.precipitation, 2.69);
        assert_eq!(report.rainfall.next_24h.rain, 2.4);
        assert_eq!(report.rainfall.unit, "mm");
    }

    #[test]
    fn short_series_are_summed_as_is() {
        let report =
            build_report("Paris, France".into(), paris(), &forecast_with_hours(5)).unwrap();

        assert_eq!(report.hourly_forecast.len(), 5);
        assert_eq!(report.rainfall.today.rain, 0.5);
        assert_eq!(report.rainfall.today.precipitation, 0.56);
    }

    #[test]
    fn daily_entries_default_missing_values() {
        let report =
            build_report("Paris, France".into(), paris(), &forecast_with_hours(1)).unwrap();

        assert_eq!(report.daily_forecast.len(), 2);
        assert_eq!(report.daily_forecast[0].description, "thunderstorm");
        assert_eq!(report.daily_forecast[1].temp_max, 26.5);
        assert_eq!(report.daily_forecast[1].temp_min, 0.0);
        assert_eq!(report.daily_forecast[1].precipitation_sum, 0.0);
    }

    #[test]
    fn rejects_forecast_without_current_block() {
        let forecast = json!({"hourly": {"time": []}});
        assert!(matches!(
            build_report("X".into(), paris(), &forecast),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn place_label_joins_name_and_country() {
        let body: GeocodingResponse = serde_json::from_value(json!({
            "results": [{"latitude": 48.85, "longitude": 2.35, "name": "Paris", "country": "France"}]
        }))
        .unwrap();
        assert_eq!(body.results[0].label(), "Paris, France");

        let empty: GeocodingResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.results.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_yields_failure_envelope() {
        let client = WeatherClient::new(
            "http://127.0.0.1:9/forecast".into(),
            "http://127.0.0.1:9/search".into(),
            Duration::from_secs(2),
        );
        let result = client.weather("Atlantis").await;

        assert!(!result.success);
        assert_eq!(result.source, SourceOrigin::OpenMeteo);
        assert!(result.data.is_none());
        assert!(result
            .message
            .as_deref()
            .unwrap_or_default()
            .starts_with("Unable to fetch weather data for \"Atlantis\"."));
    }
}
