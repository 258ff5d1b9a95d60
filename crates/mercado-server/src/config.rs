use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    /// Read `MERCADO_*` variables; `.env` should already be loaded.
    pub fn from_env() -> Result<Self> {
        let jwt_secret =
            std::env::var("MERCADO_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
        let db_path = std::env::var("MERCADO_DB_PATH").unwrap_or_else(|_| "mercado.db".into());
        let host = std::env::var("MERCADO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("MERCADO_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("MERCADO_PORT must be a port number")?;

        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            addr,
        })
    }
}
