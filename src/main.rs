use brokerlink::BrokerError;
use brokerlink::broker::Broker;
use brokerlink::config::{AppConfig, fetch_config};
use brokerlink::connectors::TigerConnector;
use brokerlink::credentials::{self, CredentialKey, populate_env_from_keychain};
use brokerlink::models::ConnectionStatus;
use tracing::{info, warn};

fn main() -> Result<(), BrokerError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    if std::env::args().nth(1).as_deref() == Some("store-credentials") {
        return store_credentials();
    }

    // Environment writes happen here, before the runtime spawns its workers.
    populate_env_from_keychain();
    let app_config = fetch_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| BrokerError::Config(format!("failed to start tokio runtime: {e}")))?;
    runtime.block_on(run(app_config))
}

async fn run(app_config: AppConfig) -> Result<(), BrokerError> {
    let connector = TigerConnector::new(&app_config.tiger)?;
    let Some(credentials) = app_config.tiger.credentials.clone() else {
        warn!("no Tiger credentials configured; set TIGER_ACCOUNT_ID, TIGER_API_KEY and TIGER_API_SECRET");
        return Ok(());
    };

    if connector.connect(credentials).await? != ConnectionStatus::Connected {
        warn!(broker = connector.name(), "could not connect");
        return Ok(());
    }

    let account = connector.get_account_info().await?;
    info!(
        account = %account.account_id,
        currency = %account.currency,
        equity = %account.equity,
        balance = %account.balance,
        positions = account.positions.len(),
        "account summary"
    );

    for order in connector.get_open_orders().await? {
        info!(
            order_id = %order.order_id,
            symbol = %order.symbol,
            side = ?order.side,
            status = ?order.status,
            filled = %order.filled_quantity,
            remaining = %order.remaining_quantity,
            "open order"
        );
    }

    Ok(())
}

/// Copies credentials from the environment into the keychain.
fn store_credentials() -> Result<(), BrokerError> {
    // Validates the pairing rules before anything is written.
    if fetch_config()?.tiger.credentials.is_none() {
        return Err(BrokerError::Config(
            "set TIGER_ACCOUNT_ID, TIGER_API_KEY and TIGER_API_SECRET to store them".to_string(),
        ));
    }

    for key in CredentialKey::ALL {
        if let Ok(value) = std::env::var(key.env_var()) {
            credentials::save(key, &value)?;
            info!(key = key.env_var(), "stored credential in keychain");
        }
    }
    Ok(())
}
