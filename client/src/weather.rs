use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use safenavi_shared::DEFAULT_CENTER;
use safenavi_shared::weather::WeatherReport;

use crate::api;
use crate::geolocation;

/// Current weather at the user's position, or at the default center without a fix.
#[component]
pub fn WeatherWidget() -> impl IntoView {
    let report = RwSignal::new(None::<WeatherReport>);

    spawn_local(async move {
        let at = match geolocation::current_position().await {
            Ok(at) => at,
            Err(e) => {
                web_sys::console::warn_1(&format!("weather falls back to default center: {e}").into());
                DEFAULT_CENTER
            }
        };
        let url = format!("/api/weather?lat={}&lon={}", at.lat, at.lng);
        match api::get_json::<WeatherReport>(&url).await {
            Ok(fetched) => {
                report.try_set(Some(fetched));
            }
            Err(e) => web_sys::console::warn_1(&format!("weather fetch failed: {e}").into()),
        }
    });

    move || {
        report.get().map(|report| {
            view! {
                <div class="weather-widget">
                    <img class="weather-icon" src=report.icon().image_path() alt="날씨" />
                    <div class="weather-text">
                        <span class="weather-temp">{report.temperature_label()}</span>
                        <span class="weather-status">
                            {report.weather_status.clone().unwrap_or_default()}
                        </span>
                        <span class="weather-address">{report.address_label().to_string()}</span>
                    </div>
                </div>
            }
        })
    }
}
