//! Service assembly and lifecycle tests.

use std::io::Write;
use std::time::Duration;

use creditgate_config::{Config, load_config};
use creditgate_server::{CancellationToken, CreditService, ServerError, run_with_shutdown};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.ledger.latency_ms = 0;
    config.persistence.retry_delay_ms = 1;
    config
}

#[tokio::test]
async fn probe_admits_up_to_balance() {
    let service = CreditService::from_config(&fast_config()).unwrap();

    // user2 is seeded with 5 credits
    let summary = service.probe("user2", 8).await;
    assert_eq!(summary.admitted, 5);
    assert_eq!(summary.rejected, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.balance, 0);
    assert_eq!(summary.ledger_balance, 0);
}

#[tokio::test]
async fn probe_unknown_user_has_no_credits() {
    let service = CreditService::from_config(&fast_config()).unwrap();
    let summary = service.probe("stranger", 3).await;
    assert_eq!(summary.admitted, 0);
    assert_eq!(summary.rejected, 3);
}

#[tokio::test]
async fn inverted_refill_range_is_rejected() {
    let mut config = fast_config();
    config.refill.minimum_credits = 50;
    assert!(matches!(
        CreditService::from_config(&config),
        Err(ServerError::Credit(_))
    ));
}

#[tokio::test]
async fn scheduler_refills_seeded_users() {
    let service = CreditService::from_config(&fast_config()).unwrap();
    let report = service
        .refill_scheduler()
        .run_once(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scanned, 4);
    assert_eq!(service.ledger().peek("user3"), Some(5));
    assert_eq!(service.ledger().peek("user4"), Some(20));
    assert_eq!(service.cache().cached_credits("user3"), Some(5));
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(run_with_shutdown(fast_config(), shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn service_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        br#"
users = ["eve"]

[ledger]
latency_ms = 0
balances = { eve = 2 }
"#,
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let service = CreditService::from_config(&config).unwrap();
    assert_eq!(service.known_users(), 1);

    let summary = service.probe("eve", 4).await;
    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.ledger_balance, 0);
}
