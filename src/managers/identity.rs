use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// A Minecraft account as confirmed by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinecraftProfile {
    pub name: String,
    pub uuid: String,
}

/// Maps a candidate username to a canonical account, or "not found."
///
/// Lookup errors are collapsed into `None`: callers treat the outcome as
/// "could not whitelist right now," never as a permanent verdict.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Option<MinecraftProfile>;
}

/// Mojang's profile-by-name response. The `id` field becomes `uuid`
/// internally.
#[derive(Debug, Deserialize)]
struct MojangProfileResponse {
    id: String,
    name: String,
}

impl From<MojangProfileResponse> for MinecraftProfile {
    fn from(response: MojangProfileResponse) -> Self {
        Self {
            name: response.name,
            uuid: response.id,
        }
    }
}

const MOJANG_PROFILE_URL: &str = "https://api.mojang.com/users/profiles/minecraft";

/// Resolver backed by Mojang's public account API. One GET per lookup, no
/// caching, no retry.
pub struct MojangResolver {
    client: reqwest::Client,
}

impl MojangResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for MojangResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for MojangResolver {
    async fn resolve(&self, username: &str) -> Option<MinecraftProfile> {
        let url = format!("{}/{}", MOJANG_PROFILE_URL, username);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Mojang lookup for '{}' failed: {}", username, e);
                return None;
            }
        };

        match response.status() {
            reqwest::StatusCode::OK => match response.json::<MojangProfileResponse>().await {
                Ok(profile) => Some(profile.into()),
                Err(e) => {
                    warn!("Mojang response for '{}' was not a profile: {}", username, e);
                    None
                }
            },
            // Mojang signals an unknown name with 404 (204 on the legacy API).
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::NO_CONTENT => None,
            status => {
                warn!("Mojang lookup for '{}' returned status {}", username, status);
                None
            }
        }
    }
}
