//! End-to-end timeline scenarios: grouping, SUM totals, transport wrap and
//! the shared cursor.

use cluster_dashboard::playback::{apply, TransportCommand};
use cluster_dashboard::{
    group_by_date, merge_activities, ActivityRecord, DashboardEngine, PlaybackState, QueryHandle,
    QueryParams, QueryPatch, QueryStore,
};

fn three_records() -> Vec<ActivityRecord> {
    vec![
        ActivityRecord::new("2023-07-01", "JYG", 4),
        ActivityRecord::new("2023-07-01", "Study Circle", 6),
        ActivityRecord::new("2023-07-02", "JYG", 2),
    ]
}

#[test]
fn test_three_record_scenario() {
    let groups = group_by_date(&three_records()).unwrap();
    let dates: Vec<&str> = groups.iter().map(|g| g.date.as_str()).collect();
    assert_eq!(dates, vec!["2023-07-01", "2023-07-02"]);

    let merged = merge_activities(&groups[0].activities);
    assert_eq!(merged.total_participants, 10);
}

#[test]
fn test_next_from_last_date_wraps() {
    let mut engine = DashboardEngine::with_records(three_records());
    let dates = engine.dates().unwrap();

    let mut store = QueryStore::new(QueryParams::default());
    store.update_current_timestep(Some("2023-07-02".to_string()));

    let state = apply(TransportCommand::Next, &dates, &mut store);
    assert_eq!(store.current_timestep.as_deref(), Some("2023-07-01"));
    assert_eq!(state, PlaybackState::Paused);

    apply(TransportCommand::Previous, &dates, &mut store);
    assert_eq!(store.current_timestep.as_deref(), Some("2023-07-02"));
}

#[test]
fn test_start_date_moves_cursor_before_fetch() {
    let handle = QueryHandle::new(QueryStore::new(QueryParams::default()));
    handle.update_current_timestep(Some("2023-07-01".to_string()));

    let page_view = handle.clone();
    handle.update_query_params(
        &QueryPatch::default()
            .start_date("2023-08-01")
            .end_date("2023-08-31"),
    );

    assert_eq!(page_view.current_timestep().as_deref(), Some("2023-08-01"));
    assert_eq!(page_view.query().end_date, "2023-08-31");
}

#[test]
fn test_empty_range_transport_is_noop() {
    let mut engine = DashboardEngine::with_records(Vec::new());
    let dates = engine.dates().unwrap();
    let mut store = QueryStore::new(QueryParams::default());

    for command in [
        TransportCommand::PlayPause,
        TransportCommand::Next,
        TransportCommand::End,
    ] {
        assert_eq!(apply(command, &dates, &mut store), PlaybackState::Paused);
        assert_eq!(store.current_timestep, None);
    }
}

#[test]
fn test_refetch_resyncs_cursor() {
    let handle = QueryHandle::new(QueryStore::new(QueryParams::default()));
    handle.update_query_params(&QueryPatch::default().start_date("2023-06-15"));

    let mut engine = DashboardEngine::with_records(three_records());
    assert!(handle.sync_with_groups(engine.groups().unwrap()));
    assert_eq!(handle.current_timestep().as_deref(), Some("2023-07-01"));

    engine.load(Vec::new());
    handle.toggle_playback();
    handle.sync_with_groups(engine.groups().unwrap());
    assert_eq!(handle.current_timestep(), None);
    assert!(!handle.is_playing());
}

#[cfg(feature = "playback")]
mod timer {
    use super::*;
    use cluster_dashboard::{Page, PlaybackTimer};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_timer_advances_while_playing() {
        let dates = Arc::new(vec![
            "2023-07-01".to_string(),
            "2023-07-02".to_string(),
            "2023-07-03".to_string(),
        ]);
        let handle = QueryHandle::new(QueryStore::new(QueryParams::default()));
        handle.update_current_timestep(Some("2023-07-01".to_string()));
        handle.toggle_playback();

        let mut timer = PlaybackTimer::new(Page::Overview, Duration::from_millis(1200));
        timer.start(handle.clone(), Arc::clone(&dates)).unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(handle.current_timestep().as_deref(), Some("2023-07-03"));

        handle.toggle_playback();
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(handle.current_timestep().as_deref(), Some("2023-07-03"));
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stop_cancels() {
        let dates = Arc::new(vec!["2023-07-01".to_string(), "2023-07-02".to_string()]);
        let handle = QueryHandle::new(QueryStore::new(QueryParams::default()));
        handle.update_current_timestep(Some("2023-07-01".to_string()));
        handle.toggle_playback();

        let mut timer = PlaybackTimer::new(Page::Geo, Duration::from_millis(1000));
        timer.start(handle.clone(), dates).unwrap();
        timer.stop();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.current_timestep().as_deref(), Some("2023-07-01"));
        assert!(!timer.is_running());
    }
}
