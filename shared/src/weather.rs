use serde::{Deserialize, Serialize};

/// Response of `GET /api/weather`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub weather_status: Option<String>,
    #[serde(default)]
    pub weather_icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIcon {
    Sunny,
    Cloudy,
    Overcast,
    Rain,
    Snow,
    Unknown,
}

impl WeatherIcon {
    pub fn classify(status: &str) -> Self {
        if status.contains("맑음") {
            Self::Sunny
        } else if status.contains("구름") {
            Self::Cloudy
        } else if status.contains("흐림") {
            Self::Overcast
        } else if status.contains('비') {
            Self::Rain
        } else if status.contains('눈') {
            Self::Snow
        } else {
            Self::Unknown
        }
    }

    pub fn image_path(self) -> &'static str {
        match self {
            Self::Sunny => "/img/weather/sunny.png",
            Self::Cloudy => "/img/weather/cloudy.png",
            Self::Overcast => "/img/weather/overcast.png",
            Self::Rain => "/img/weather/rain.png",
            Self::Snow => "/img/weather/snow.png",
            Self::Unknown => "/img/weather/default.png",
        }
    }
}

impl WeatherReport {
    pub fn icon(&self) -> WeatherIcon {
        self.weather_status
            .as_deref()
            .map_or(WeatherIcon::Unknown, WeatherIcon::classify)
    }

    pub fn temperature_label(&self) -> String {
        self.temp
            .map_or_else(|| "-".to_string(), |t| format!("{t:.1}°C"))
    }

    pub fn address_label(&self) -> &str {
        self.address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or("위치 정보 없음")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_from_status_text() {
        assert_eq!(WeatherIcon::classify("맑음"), WeatherIcon::Sunny);
        assert_eq!(WeatherIcon::classify("구름많음"), WeatherIcon::Cloudy);
        assert_eq!(WeatherIcon::classify("흐림"), WeatherIcon::Overcast);
        assert_eq!(WeatherIcon::classify("비/눈"), WeatherIcon::Rain);
        assert_eq!(WeatherIcon::classify("눈"), WeatherIcon::Snow);
        assert_eq!(WeatherIcon::classify("안개"), WeatherIcon::Unknown);
    }

    #[test]
    fn report_labels() {
        let report: WeatherReport = serde_json::from_str(
            r#"{"address":"서울 중구","temp":3.26,"weatherStatus":"맑음"}"#,
        )
        .unwrap();
        assert_eq!(report.icon(), WeatherIcon::Sunny);
        assert_eq!(report.temperature_label(), "3.3°C");
        assert_eq!(WeatherReport::default().address_label(), "위치 정보 없음");
    }
}
