//! Scan cycles against a scripted upstream, in-memory stores and queue.

use chrono::Duration as ChronoDuration;
use chrono::Timelike;
use tickwatch::core::{InstrumentOutcome, ScanError, Scanner};
use tickwatch::models::{InstrumentKind, StrategyConfig};
use tickwatch::services::FetchError;

use crate::test_utils::{
    declining_candles, equity, flat_candles, saturday_morning, tuesday_lunch, tuesday_morning,
    TestPipeline,
};

fn scanner(pipeline: &TestPipeline) -> Scanner {
    Scanner::new(pipeline.ctx.clone())
}

#[tokio::test]
async fn oversold_instrument_pushes_buy_alarm() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    pipeline.provider.set_realtime_price(123.0);

    let now = tuesday_morning();
    let report = scanner(&pipeline).run_cycle_at(now).await;

    assert!(!report.aborted);
    assert_eq!(report.scanned, 1);
    assert_eq!(report.signals, 1);
    assert_eq!(report.pushed, 1);

    let queued = pipeline.queue.drain().await;
    assert_eq!(queued.len(), 1);
    let alarm = &queued[0];
    assert_eq!(alarm.instrument_code, "600519");
    assert_eq!(alarm.instrument_name, "Kweichow Moutai");
    assert_eq!(alarm.user_id, 1);
    assert_eq!(alarm.reason, "RSI buy");
    assert!(alarm.value < 30.0, "RSI was {}", alarm.value);
    assert_eq!(alarm.threshold, 30.0);
    assert_eq!(alarm.price, 123.0);
    assert_eq!(alarm.timestamp.hour(), 10);

    // Unknown instrument gets the default strategy, stamped with the push time.
    assert_eq!(pipeline.store.defaults_created(), 1);
    let strategy = pipeline.store.strategy("600519").await.unwrap();
    assert_eq!(strategy.last_notify_time, Some(now));
    assert_eq!(pipeline.metrics.alarms_pushed_total.get(), 1.0);
}

#[tokio::test]
async fn cooldown_suppresses_recent_alert() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));

    let now = tuesday_morning();
    let last = now - ChronoDuration::minutes(10);
    let mut strategy = StrategyConfig::default_for("600519");
    strategy.last_notify_time = Some(last);
    pipeline.store.set_strategy(strategy).await;

    let report = scanner(&pipeline).run_cycle_at(now).await;

    assert_eq!(report.signals, 1);
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.pushed, 0);
    assert!(pipeline.queue.is_empty().await);
    let stored = pipeline.store.strategy("600519").await.unwrap();
    assert_eq!(stored.last_notify_time, Some(last));
}

#[tokio::test]
async fn expired_cooldown_pushes_and_restamps() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));

    let now = tuesday_morning();
    let mut strategy = StrategyConfig::default_for("600519");
    strategy.last_notify_time = Some(now - ChronoDuration::minutes(40));
    pipeline.store.set_strategy(strategy).await;

    let report = scanner(&pipeline).run_cycle_at(now).await;

    assert_eq!(report.pushed, 1);
    assert_eq!(pipeline.queue.len().await, 1);
    let stored = pipeline.store.strategy("600519").await.unwrap();
    assert_eq!(stored.last_notify_time, Some(now));
}

#[tokio::test]
async fn weekend_cycle_aborts_before_any_work() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));

    let report = scanner(&pipeline).run_cycle_at(saturday_morning()).await;

    assert!(report.aborted);
    assert_eq!(report.scanned, 0);
    assert_eq!(pipeline.provider.history_calls(), 0);
    assert_eq!(pipeline.store.defaults_created(), 0);
    assert!(pipeline.queue.is_empty().await);
}

#[tokio::test]
async fn failing_instrument_does_not_stop_the_cycle() {
    let pipeline = TestPipeline::new(vec![
        equity("000001", "Ping An Bank"),
        equity("600519", "Kweichow Moutai"),
    ]);
    pipeline
        .provider
        .fail_history("000001", FetchError::Terminal("unknown symbol".to_string()));
    pipeline.provider.set_history("600519", declining_candles(80));

    let report = scanner(&pipeline).run_cycle_at(tuesday_morning()).await;

    assert_eq!(report.scanned, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pushed, 1);
    // Terminal errors are not retried.
    assert_eq!(pipeline.provider.history_calls(), 2);
    let queued = pipeline.queue.drain().await;
    assert_eq!(queued[0].instrument_code, "600519");
    assert_eq!(pipeline.metrics.instrument_failures_total.get(), 1.0);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    pipeline
        .provider
        .fail_next("600519", FetchError::Transient("connection reset".to_string()));
    pipeline
        .provider
        .fail_next("600519", FetchError::Transient("timed out".to_string()));

    let report = scanner(&pipeline).run_cycle_at(tuesday_morning()).await;

    assert_eq!(pipeline.provider.history_calls(), 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pushed, 1);
}

#[tokio::test]
async fn exhausted_retries_skip_the_instrument() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline
        .provider
        .fail_history("600519", FetchError::Transient("connection refused".to_string()));

    let scanner = scanner(&pipeline);
    let err = scanner
        .scan_instrument(&equity("600519", "Kweichow Moutai"), tuesday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Fetch(FetchError::Transient(_))));
    // One attempt plus three retries.
    assert_eq!(pipeline.provider.history_calls(), 4);
}

#[tokio::test]
async fn default_strategy_created_only_once() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", flat_candles(80));

    let scanner = scanner(&pipeline);
    scanner.run_cycle_at(tuesday_morning()).await;
    scanner
        .run_cycle_at(tuesday_morning() + ChronoDuration::minutes(5))
        .await;

    assert_eq!(pipeline.store.defaults_created(), 1);
    assert_eq!(pipeline.provider.history_calls(), 2);
}

#[tokio::test]
async fn lunch_break_alarm_carries_zero_price() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    pipeline.provider.set_realtime_price(123.0);

    let report = scanner(&pipeline).run_cycle_at(tuesday_lunch()).await;

    assert_eq!(report.pushed, 1);
    assert_eq!(pipeline.provider.realtime_calls(), 0);
    let queued = pipeline.queue.drain().await;
    assert_eq!(queued[0].price, 0.0);
}

#[tokio::test]
async fn unreachable_queue_leaves_cooldown_untouched() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    pipeline.queue.set_offline(true);

    let scanner = scanner(&pipeline);
    let outcome = scanner
        .scan_instrument(&equity("600519", "Kweichow Moutai"), tuesday_morning())
        .await
        .unwrap();

    assert_eq!(outcome, InstrumentOutcome::PushFailed);
    let stored = pipeline.store.strategy("600519").await.unwrap();
    assert_eq!(stored.last_notify_time, None);
    assert_eq!(pipeline.metrics.alarm_push_failures_total.get(), 1.0);
}

#[tokio::test]
async fn flat_series_fires_nothing() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", flat_candles(80));

    let report = scanner(&pipeline).run_cycle_at(tuesday_morning()).await;

    assert_eq!(report.scanned, 1);
    assert_eq!(report.signals, 0);
    assert!(pipeline.queue.is_empty().await);
    assert_eq!(pipeline.provider.realtime_calls(), 0);
}

#[tokio::test]
async fn disabled_push_logs_signal_only() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    let mut strategy = StrategyConfig::default_for("600519");
    strategy.enable_push = false;
    pipeline.store.set_strategy(strategy).await;

    let outcome = scanner(&pipeline)
        .scan_instrument(&equity("600519", "Kweichow Moutai"), tuesday_morning())
        .await
        .unwrap();

    assert_eq!(outcome, InstrumentOutcome::PushDisabled);
    assert!(pipeline.queue.is_empty().await);
    assert_eq!(pipeline.store.strategy("600519").await.unwrap().last_notify_time, None);
}

#[tokio::test]
async fn trend_filter_tightens_buy_in_downtrend() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    let mut strategy = StrategyConfig::default_for("600519");
    strategy.enable_trend_filter = true;
    pipeline.store.set_strategy(strategy).await;

    let outcome = scanner(&pipeline)
        .scan_instrument(&equity("600519", "Kweichow Moutai"), tuesday_morning())
        .await
        .unwrap();

    // RSI near 19 still clears the tightened 25 threshold.
    match outcome {
        InstrumentOutcome::Pushed(alarm) => assert_eq!(alarm.threshold, 25.0),
        other => panic!("expected push, got {:?}", other),
    }
}

#[tokio::test]
async fn invalid_strategy_skips_instrument() {
    let pipeline = TestPipeline::new(vec![equity("600519", "Kweichow Moutai")]);
    pipeline.provider.set_history("600519", declining_candles(80));
    let mut strategy = StrategyConfig::default_for("600519");
    strategy.rsi_low = 80.0;
    strategy.rsi_high = 20.0;
    pipeline.store.set_strategy(strategy).await;

    let report = scanner(&pipeline).run_cycle_at(tuesday_morning()).await;

    assert_eq!(report.failed, 1);
    assert_eq!(pipeline.provider.history_calls(), 0);
}

#[tokio::test]
async fn short_history_is_a_per_instrument_failure() {
    let pipeline = TestPipeline::new(vec![equity("159915", "ChiNext ETF")]);
    pipeline.provider.set_history("159915", flat_candles(5));

    let err = scanner(&pipeline)
        .scan_instrument(
            &tickwatch::models::Instrument::new("159915", "ChiNext ETF", InstrumentKind::Fund),
            tuesday_morning(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Indicator(_)));
}
