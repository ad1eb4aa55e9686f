use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use petcare_models::settings::Settings;

/// Defaults, then `appsettings` and `appsettings.local` files, then `APP__*`
/// environment variables (`APP__REMINDERS__OFFSETS=1d,2h`).
pub fn load() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .set_default("reminders.offsets", vec!["5m", "3m", "1m"])?
        .set_default("calendar.timezone", "UTC")?
        .add_source(File::with_name("appsettings").required(false))
        .add_source(File::with_name("appsettings.local").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("reminders.offsets"),
        )
        .build()?;

    settings.try_deserialize()
}

pub fn timezone(settings: &Settings) -> anyhow::Result<Tz> {
    let name = &settings.calendar.timezone;
    name.parse()
        .map_err(|e| anyhow::anyhow!("Invalid calendar.timezone '{name}': {e}"))
}
