use serde::Deserialize;
use tokio::sync::RwLock;

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Debug, Deserialize, Clone)]
pub struct Jwk {
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Cache of Google's signing keys. Owned by `AppState`; refetched only when
/// an unknown key id shows up (key rotation).
pub struct GoogleJwkCache {
    http: reqwest::Client,
    keys: RwLock<Vec<Jwk>>,
}

impl GoogleJwkCache {
    pub fn new() -> Self {
        GoogleJwkCache {
            http: reqwest::Client::new(),
            keys: RwLock::new(Vec::new()),
        }
    }

    pub async fn get_key(&self, kid: &str) -> anyhow::Result<Jwk> {
        {
            let keys = self.keys.read().await;
            if let Some(key) = keys.iter().find(|k| k.kid == kid) {
                return Ok(key.clone());
            }
        }

        let fetched: JwkSet = self
            .http
            .get(GOOGLE_JWKS_URL)
            .send()
            .await?
            .json()
            .await?;

        let mut keys = self.keys.write().await;
        *keys = fetched.keys;

        keys.iter()
            .find(|k| k.kid == kid)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Google key {kid} not found"))
    }
}
