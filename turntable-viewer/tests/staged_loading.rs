//! Integration tests for the staged loader

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use turntable_core::{IdleStrategy, MaterialBaseline, SchedulingConfig};
use turntable_viewer::{
    load_channel, scheduler_for, HostIdleScheduler, IdleScheduler, LoadEvent, StagedLoader, TimerIdleScheduler,
    ViewerState,
};

fn loader(ids: &[&str], failing: &[&str], env_fails: bool, scheduler: Arc<dyn IdleScheduler>, log: &EventLog) -> StagedLoader {
    StagedLoader::new(
        catalog(ids),
        Arc::new(FakeSource::new(failing, log.clone())),
        Arc::new(FakeEnvironment::new(env_fails, log.clone())),
        scheduler,
        MaterialBaseline::default(),
    )
}

fn timer() -> Arc<dyn IdleScheduler> {
    Arc::new(TimerIdleScheduler::new(&SchedulingConfig::default()))
}

#[tokio::test(start_paused = true)]
async fn first_model_is_active_before_anything_else_is_requested() {
    let log = event_log();
    let loader = loader(&["e11", "ramen", "lamp"], &[], false, timer(), &log);
    let summary = loader.run(&RecordingSink::new(log.clone())).await;

    let log = entries(&log);
    let active = position(&log, "active:e11");
    assert!(position(&log, "start:e11") < active);
    assert!(active < position(&log, "env:start"));
    assert!(active < position(&log, "start:ramen"));

    assert_eq!(summary.loaded, 3);
    assert_eq!(summary.failed, 0);
    assert!(summary.environment);
}

#[tokio::test(start_paused = true)]
async fn background_models_load_one_at_a_time_in_catalog_order() {
    let log = event_log();
    let loader = loader(&["a", "b", "c", "d"], &["c"], false, timer(), &log);
    loader.run(&RecordingSink::new(log.clone())).await;

    let log = entries(&log);
    assert!(position(&log, "ready:b") < position(&log, "start:c"));
    assert!(position(&log, "failed:c") < position(&log, "start:d"));
    let starts: Vec<_> = log.iter().filter(|e| e.starts_with("start:")).cloned().collect();
    assert_eq!(starts, ["start:a", "start:b", "start:c", "start:d"]);
}

#[tokio::test(start_paused = true)]
async fn timer_strategy_uses_fallback_delays() {
    let log = event_log();
    let loader = loader(&["a", "b", "c"], &[], false, timer(), &log);
    let start = Instant::now();
    loader.run(&RecordingSink::new(log.clone())).await;

    // a: 50ms, then b after a 200ms delay and c after a further 300ms
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(650), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(700), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn host_strategy_forces_loads_after_timeout() {
    let log = event_log();
    let (scheduler, _idle) = HostIdleScheduler::new(&SchedulingConfig::default());
    let loader = loader(&["a", "b"], &[], false, Arc::new(scheduler), &log);
    let start = Instant::now();
    loader.run(&RecordingSink::new(log.clone())).await;

    // Nobody reports idle: the environment goes after 1.5s, b after 1s
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1630), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1700), "{:?}", elapsed);
    let log = entries(&log);
    assert!(position(&log, "start:b") < position(&log, "env:start"));
}

#[tokio::test(start_paused = true)]
async fn idle_reports_let_deferred_loads_start_early() {
    let log = event_log();
    let mut config = SchedulingConfig::default();
    config.idle_strategy = IdleStrategy::Host;
    let (scheduler, idle) = scheduler_for(&config);
    let idle = idle.unwrap();
    let loader = loader(&["a", "b"], &[], false, scheduler, &log);

    let start = Instant::now();
    let sink = RecordingSink::new(log.clone());
    tokio::join!(loader.run(&sink), async {
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(16)).await;
            idle.report_idle();
        }
    });
    assert!(start.elapsed() < Duration::from_millis(500), "{:?}", start.elapsed());
}

#[tokio::test(start_paused = true)]
async fn failed_first_entry_hands_critical_path_to_the_next() {
    let log = event_log();
    let loader = loader(&["e11", "ramen", "lamp"], &["e11"], false, timer(), &log);
    let summary = loader.run(&RecordingSink::new(log.clone())).await;

    let log = entries(&log);
    assert!(position(&log, "failed:e11") < position(&log, "active:ramen"));
    assert!(position(&log, "active:ramen") < position(&log, "start:lamp"));
    assert!(position(&log, "active:ramen") < position(&log, "env:start"));
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn nothing_else_is_requested_when_every_model_fails() {
    let log = event_log();
    let loader = loader(&["e11", "ramen"], &["e11", "ramen"], false, timer(), &log);
    let summary = loader.run(&RecordingSink::new(log.clone())).await;

    let log = entries(&log);
    assert!(!log.iter().any(|e| e.starts_with("active:") || e.starts_with("env:")));
    assert_eq!(log.last().map(String::as_str), Some("finished:0:2"));
    assert_eq!(summary.loaded, 0);
}

#[tokio::test(start_paused = true)]
async fn environment_failure_is_contained() {
    let log = event_log();
    let loader = loader(&["e11", "ramen"], &[], true, timer(), &log);
    let summary = loader.run(&RecordingSink::new(log.clone())).await;

    assert!(!summary.environment);
    assert_eq!(summary.loaded, 2);
    assert!(entries(&log).contains(&"env:failed:environment".to_string()));
}

#[tokio::test(start_paused = true)]
async fn channel_events_build_catalog_ordered_state() {
    let log = event_log();
    let loader = loader(&["e11", "ramen", "lamp"], &["ramen"], false, timer(), &log);
    let (sink, events) = load_channel();
    let task = tokio::spawn(async move { loader.run(&sink).await });

    let mut state = ViewerState::new();
    let mut environment = false;
    loop {
        match events.recv_async().await {
            Ok(LoadEvent::FirstReady { instance, shown }) => {
                state.insert(instance);
                shown.send(()).unwrap();
            }
            Ok(LoadEvent::ModelReady(instance)) => {
                state.insert(instance);
            }
            Ok(LoadEvent::Failed(error)) => state.settle(&error.asset),
            Ok(LoadEvent::EnvironmentReady(_)) => environment = true,
            Ok(LoadEvent::EnvironmentFailed(_)) => {}
            Ok(LoadEvent::Finished(_)) | Err(_) => break,
        }
    }

    let summary = task.await.unwrap();
    assert_eq!(summary.loaded, 2);
    assert!(environment);
    let ids: Vec<_> = state.instances().iter().map(|i| i.descriptor.id.as_str()).collect();
    assert_eq!(ids, ["e11", "lamp"]);
    assert!(state.instances().iter().all(|i| !i.is_visible()));
}
