use std::env;
use std::time::Duration;

use chrono::FixedOffset;

const DEFAULT_UTC_OFFSET_HOURS: i32 = -5;

fn offset_from_env() -> i32 {
    env::var("BUSINESS_UTC_OFFSET_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_UTC_OFFSET_HOURS)
}

/// Fixed offset for a whole number of hours, falling back to UTC-5 when out of range.
pub fn business_offset(hours: i32) -> FixedOffset {
    let hours = if (-12..=14).contains(&hours) { hours } else { DEFAULT_UTC_OFFSET_HOURS };
    FixedOffset::east_opt(hours * 3600).unwrap()
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub square_access_token: String,
    pub square_environment: String,
    pub moderation_api_key: String,
    pub business_utc_offset_hours: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "hvacbook.db".to_string()),
            square_access_token: env::var("SQUARE_ACCESS_TOKEN").unwrap_or_default(),
            square_environment: env::var("SQUARE_ENVIRONMENT")
                .unwrap_or_else(|_| "sandbox".to_string()),
            moderation_api_key: env::var("MODERATION_API_KEY").unwrap_or_default(),
            business_utc_offset_hours: offset_from_env(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        business_offset(self.business_utc_offset_hours)
    }
}

/// Terminal booking client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub business_utc_offset_hours: i32,
    pub demo_submit_delay: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            business_utc_offset_hours: offset_from_env(),
            demo_submit_delay: Duration::from_millis(
                env::var("DEMO_SUBMIT_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1500),
            ),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        business_offset(self.business_utc_offset_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_offset() {
        assert_eq!(business_offset(-5).local_minus_utc(), -5 * 3600);
        assert_eq!(business_offset(3).local_minus_utc(), 3 * 3600);
        assert_eq!(business_offset(99).local_minus_utc(), -5 * 3600);
    }
}
