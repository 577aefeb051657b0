//! Board against the in-memory store, logging through rolling-logger.

use std::sync::Arc;
use std::time::Duration;

use taskboard::{
    Board, BoardConfig, Hover, HoverRect, InMemoryRemote, ItemId, NewTask, RemoteStore, Status,
    SyncEvent, TaskPatch,
};

#[tokio::test(start_paused = true)]
async fn test_session_flow_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    rolling_logger::init_logger(dir.path(), "taskboard").unwrap();

    let remote = Arc::new(InMemoryRemote::new());
    remote.fail_next_creates(1);
    let store: Arc<dyn RemoteStore> = remote.clone();
    let mut board = Board::new(BoardConfig::default(), store).unwrap();

    let first = board.create(NewTask::new("Follow up", Status::Todo)).unwrap();
    let second = board.create(NewTask::new("Send quote", Status::Todo)).unwrap();

    let mut failed = None;
    for _ in 0..2 {
        match board.next_sync_event().await {
            Some(SyncEvent::CreateFailed { temp_id, .. }) => failed = Some(temp_id),
            Some(SyncEvent::Confirmed { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
    let failed = failed.unwrap();
    board.retry_create(&failed).unwrap();
    assert!(matches!(
        board.next_sync_event().await,
        Some(SyncEvent::Confirmed { .. })
    ));
    assert!(board.pending_creates().is_empty());
    assert!(board.get(&first).is_none());
    assert!(board.get(&second).is_none());

    // Move the top task below the other one
    let top = board.items_in_column(Status::Todo)[0].id.clone();
    let bottom = board.items_in_column(Status::Todo)[1].id.clone();
    board.start_drag(&top).unwrap();
    let hover = Hover::item(bottom.clone(), HoverRect::new(40.0, 40.0));
    board.update_drag_projection(Some(&hover), 75.0);
    board.end_drag();
    board.update(&top, TaskPatch::title("Follow up Friday")).unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    let stored = remote.task(&top).unwrap();
    assert_eq!(stored["order"], 1);
    assert_eq!(stored["title"], "Follow up Friday");
    assert_eq!(remote.task(&bottom).unwrap()["order"], 0);

    let lines = rolling_logger::recent_lines();
    assert!(lines.iter().any(|line| line.contains(&format!("create of {} failed", failed))));
    assert!(lines.iter().any(|line| line.contains("confirmed as")));
    assert!(rolling_logger::log_file_path().unwrap().exists());
    assert!(board.get(&ItemId::from("real-1")).is_some());
}
