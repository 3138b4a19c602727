use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// OAuth client id expected as the `aud` of Google ID tokens.
    pub google_client_id: Option<String>,
}

impl AppConfig {
    /// Loads the dotenv file for the current `APP_ENV` and then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let env = optional("APP_ENV").unwrap_or_else(|| "dev".into());
        let dotenv_file = if env == "test" { ".env.test" } else { ".env" };
        // A missing file is fine; the process environment still applies.
        dotenvy::from_filename(dotenv_file).ok();

        let port = match optional("APP_PORT") {
            Some(_) => parsed_or("APP_PORT", 8080_u16)?,
            None => parsed_or("PORT", 8080_u16)?,
        };

        Ok(Self {
            env,
            database_url: required("DATABASE_URL")?,
            db_max_connections: positive_or("DB_MAX_CONNECTIONS", 10)?,
            host: optional("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            request_timeout_secs: positive_or("REQUEST_TIMEOUT_SECS", 30)?,
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                ttl_hours: positive_or("JWT_TTL_HOURS", 24)?,
            },
            google_client_id: optional("GOOGLE_CLIENT_ID"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("missing env: {key}"))
}

/// `default` when unset; an error when set to something that does not parse.
fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match optional(key) {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("invalid value for {key}: {v:?}")),
        None => Ok(default),
    }
}

fn positive_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value = parsed_or(key, default)?;
    if value <= T::default() {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_values() {
        std::env::set_var("COURTMATCH_TEST_BLANK", "   ");
        let err = required("COURTMATCH_TEST_BLANK").unwrap_err();
        assert!(err.to_string().contains("COURTMATCH_TEST_BLANK"));
    }

    #[test]
    fn parsed_or_rejects_garbage_and_defaults_when_unset() {
        std::env::set_var("COURTMATCH_TEST_TTL", "soon");
        let err = parsed_or("COURTMATCH_TEST_TTL", 24_u64).unwrap_err();
        assert!(err.to_string().contains("COURTMATCH_TEST_TTL"));

        std::env::set_var("COURTMATCH_TEST_TTL", "48");
        assert_eq!(parsed_or("COURTMATCH_TEST_TTL", 24_u64).unwrap(), 48);

        std::env::remove_var("COURTMATCH_TEST_UNSET");
        assert_eq!(parsed_or("COURTMATCH_TEST_UNSET", 24_u64).unwrap(), 24);
    }

    #[test]
    fn positive_or_rejects_zero_and_negative() {
        std::env::set_var("COURTMATCH_TEST_TIMEOUT", "0");
        assert!(positive_or("COURTMATCH_TEST_TIMEOUT", 30_u64).is_err());

        std::env::set_var("COURTMATCH_TEST_POOL", "-2");
        assert!(positive_or("COURTMATCH_TEST_POOL", 10_u32).is_err());

        std::env::set_var("COURTMATCH_TEST_POOL", "4");
        assert_eq!(positive_or("COURTMATCH_TEST_POOL", 10_u32).unwrap(), 4);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = AppConfig {
            env: "test".into(),
            database_url: "postgres://localhost/courtmatch".into(),
            db_max_connections: 2,
            host: "127.0.0.1".into(),
            port: 9090,
            request_timeout_secs: 5,
            jwt: JwtConfig {
                secret: "s".into(),
                ttl_hours: 24,
            },
            google_client_id: None,
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9090");
    }
}
