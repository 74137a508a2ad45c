mod support;

use std::sync::Arc;

use anyhow::Result;
use mnav_tracker::config::RefreshMode;
use mnav_tracker::service::ConfigUpdateRequest;
use support::{build_service, fixed_clock, MockPriceSource};

async fn configure_both(service: &mnav_tracker::TrackerService) -> Result<()> {
    service
        .update_config(&ConfigUpdateRequest::new("SBET", 129_038_060.0, 521_939.0))
        .await?;
    service
        .update_config(&ConfigUpdateRequest::new("BMNR", 121_700_000.0, 833_137.0))
        .await?;
    Ok(())
}

#[tokio::test]
async fn failed_equity_only_blanks_its_own_metric() -> Result<()> {
    let clock = fixed_clock();
    let source = Arc::new(
        MockPriceSource::new(clock.clone())
            .with_price("SBET", 10.0)
            .with_price("ETH", 3000.0),
    );
    let service = build_service(source, clock, RefreshMode::Scheduled).await?;
    configure_both(&service).await?;

    let outcome = service.trigger_manual_refresh().await;
    let snapshot = outcome.snapshot().unwrap();

    assert_eq!(snapshot.price("BMNR"), None);
    assert_eq!(snapshot.metric("BMNR"), None);
    assert!(snapshot.metric("SBET").is_some());
    assert_eq!(snapshot.failed_fetches(), vec!["BMNR"]);
    assert_eq!(service.history().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_reserve_blanks_every_metric_but_keeps_prices() -> Result<()> {
    let clock = fixed_clock();
    let source = Arc::new(
        MockPriceSource::new(clock.clone())
            .with_price("SBET", 10.0)
            .with_price("BMNR", 45.0),
    );
    let service = build_service(source, clock, RefreshMode::Scheduled).await?;
    configure_both(&service).await?;

    let outcome = service.trigger_manual_refresh().await;
    let snapshot = outcome.snapshot().unwrap();

    assert_eq!(snapshot.price("SBET"), Some(10.0));
    assert_eq!(snapshot.price("BMNR"), Some(45.0));
    assert_eq!(snapshot.reserve_price(), None);
    assert!(snapshot.metrics.iter().all(|m| m.value.is_none()));
    assert_eq!(snapshot.metrics.len(), 2);
    Ok(())
}

#[tokio::test]
async fn total_outage_still_records_a_cycle() -> Result<()> {
    let clock = fixed_clock();
    let source = Arc::new(MockPriceSource::new(clock.clone()));
    let service = build_service(source.clone(), clock, RefreshMode::Scheduled).await?;

    let outcome = service.trigger_manual_refresh().await;
    let snapshot = outcome.snapshot().unwrap();
    assert_eq!(snapshot.failed_fetches(), vec!["SBET", "BMNR", "ETH"]);
    assert_eq!(service.history().await?.len(), 1);

    // Recovery on the next cycle.
    source.set_price("ETH", Some(2500.0));
    let outcome = service.trigger_manual_refresh().await;
    assert_eq!(outcome.snapshot().unwrap().reserve_price(), Some(2500.0));
    Ok(())
}
