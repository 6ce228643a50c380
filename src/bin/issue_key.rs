//! Issue an API key for the gateway.
//!
//! ```text
//! wp-mcp-issue-key <name> [scope,scope,...]
//! ```
//!
//! Prints the plaintext key and signing secret once. Only the key digest and
//! the encrypted signing secret are stored.

use tracing_subscriber::EnvFilter;

use wp_mcp_gateway::{
    config::Config,
    db,
    services::key_service,
    store::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(name) = args.next().filter(|n| !n.trim().is_empty()) else {
        anyhow::bail!("usage: wp-mcp-issue-key <name> [scope,scope,...]");
    };
    let scopes = key_service::parse_scope_list(args.next().as_deref());

    let config = Config::from_env()?;
    let security = config.security()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    let issued = key_service::issue_key(&scopes, &security.app_secret)?;
    let id = store.insert_api_key(name.trim(), &issued).await?;
    tracing::info!(api_key_id = id, "API key issued");

    println!("api_key_id:     {id}");
    println!("scopes:         {}", scopes.iter().collect::<Vec<_>>().join(","));
    println!("api_key:        {}", issued.api_key);
    println!("signing_secret: {}", issued.signing_secret);
    println!();
    println!("Store both values now; they cannot be shown again.");

    Ok(())
}
