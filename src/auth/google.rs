use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::debug;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity extracted from a verified third-party ID token.
#[derive(Debug, Clone)]
pub struct VerifiedIdToken {
    pub subject: String,
    pub email: Option<String>,
}

/// Verifies OAuth ID tokens against the identity provider.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str, audience: &str) -> anyhow::Result<VerifiedIdToken>;
}

/// Google's `tokeninfo` endpoint checks the signature and expiry; audience and
/// issuer are checked here.
pub struct GoogleTokenInfo {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    exp: String,
    email: Option<String>,
}

impl GoogleTokenInfo {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            endpoint: TOKENINFO_URL.to_string(),
        })
    }
}

#[async_trait]
impl IdTokenVerifier for GoogleTokenInfo {
    async fn verify(&self, id_token: &str, audience: &str) -> anyhow::Result<VerifiedIdToken> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .context("tokeninfo request")?;
        if !res.status().is_success() {
            anyhow::bail!("tokeninfo rejected token: {}", res.status());
        }
        let info: TokenInfo = res.json().await.context("decode tokeninfo")?;
        check_claims(info, audience, OffsetDateTime::now_utc())
    }
}

fn check_claims(
    info: TokenInfo,
    audience: &str,
    now: OffsetDateTime,
) -> anyhow::Result<VerifiedIdToken> {
    if info.aud != audience {
        anyhow::bail!("audience mismatch");
    }
    if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
        anyhow::bail!("unexpected issuer {}", info.iss);
    }
    let exp: i64 = info.exp.parse().context("exp is not a timestamp")?;
    if exp <= now.unix_timestamp() {
        anyhow::bail!("id token expired");
    }
    debug!(sub = %info.sub, "google id token verified");
    Ok(VerifiedIdToken {
        subject: info.sub,
        email: info
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    })
}
