use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path of the JSON file holding the data tree (created if missing)
    /// Can also be set using the DATA_FILE environment variable.
    /// Default value: andromeda.json
    #[arg(long, env = "DATA_FILE", default_value = "andromeda.json")]
    pub data_file: PathBuf,

    /// Server listen address and port (e.g., "127.0.0.1:3000")
    /// Can also be set using the SERVER_ADDRESS environment variable.
    /// Default value: 127.0.0.1:3000
    #[arg(long, env = "SERVER_ADDRESS", default_value = "127.0.0.1:3000")]
    pub server_address: SocketAddr,

    /// Keycloak server address and port (e.g., "127.0.0.1:8080")
    /// Can also be set using the KEYCLOAK_SERVER_URL environment variable.
    /// Default value: 127.0.0.1:8080
    #[arg(long, env = "KEYCLOAK_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    pub keycloak_server_url: Url,

    /// Keycloak realm name
    /// Can also be set using the KEYCLOAK_REALM environment variable.
    /// Default value: andromeda
    #[arg(long, env = "KEYCLOAK_REALM", default_value = "andromeda")]
    pub keycloak_realm: String,

    /// Keycloak allowed audiences (e.g., "account")
    /// Can also be set using the KEYCLOAK_AUDIENCES environment variable.
    /// Default value: account
    #[arg(long, env = "KEYCLOAK_AUDIENCES", default_value = "account")]
    pub keycloak_audiences: String,

    /// Log level (e.g., "info")
    /// Can also be set using the RUST_LOG environment variable.
    /// Default value: info
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}
