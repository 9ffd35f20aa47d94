use async_trait::async_trait;
use minecraft_client_rs::Client;
use tracing::{debug, error};

/// Mutates the game server's allow-list over its administrative protocol.
///
/// Every failure collapses into `false`; the caller only needs to know
/// whether the round trip completed.
#[async_trait]
pub trait WhitelistGateway: Send + Sync {
    async fn grant(&self, username: &str) -> bool;
    async fn revoke(&self, username: &str) -> bool;
}

/// RCON-backed gateway. Opens a fresh session per command and closes it
/// afterwards; sessions are never pooled or shared.
pub struct RconGateway {
    address: String,
    password: String,
}

impl RconGateway {
    pub fn new(host: &str, port: u16, password: &str) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            password: password.to_string(),
        }
    }

    /// Connect, authenticate, issue exactly one command, disconnect. The RCON
    /// client is blocking, so the session runs on the blocking pool.
    async fn run_command(&self, command: String) -> bool {
        let address = self.address.clone();
        let password = self.password.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut client = Client::new(address).map_err(|e| e.to_string())?;
            client.authenticate(password).map_err(|e| e.to_string())?;
            let response = client.send_command(command).map_err(|e| e.to_string())?;
            let _ = client.close();
            Ok::<String, String>(response.body)
        })
        .await;

        match outcome {
            Ok(Ok(body)) => {
                debug!("RCON response: {}", body.trim());
                true
            }
            Ok(Err(e)) => {
                error!("RCON command failed: {}", e);
                false
            }
            Err(e) => {
                error!("RCON session task failed: {:?}", e);
                false
            }
        }
    }
}

#[async_trait]
impl WhitelistGateway for RconGateway {
    async fn grant(&self, username: &str) -> bool {
        self.run_command(format!("whitelist add {}", username)).await
    }

    async fn revoke(&self, username: &str) -> bool {
        self.run_command(format!("whitelist remove {}", username))
            .await
    }
}
