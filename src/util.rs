use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub dbname: String,
    #[serde_as(as = "DisplayFromStr")]
    pub sslmode: PgSslMode,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl PgConfig {
    /// Create a connection pool.
    pub async fn connect(self) -> Result<PgPool, sqlx::Error> {
        let max_connections = self.max_connections;
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(self.into())
            .await
    }
}

impl From<PgConfig> for PgConnectOptions {
    fn from(config: PgConfig) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.host)
            .username(&config.user)
            .password(config.password.expose_secret())
            .database(&config.dbname)
            .port(config.port)
            .ssl_mode(config.sslmode)
    }
}

fn default_max_connections() -> u32 {
    10
}
