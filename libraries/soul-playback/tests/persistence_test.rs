//! Session persistence integration tests
//!
//! Capture a session from one orchestrator and restore it into a fresh
//! one, through the key/value stores the host would use.


use soul_core::{KeyValueStore, Track, TrackListId};
use soul_playback::{
    ExhaustOutcome, PersistedPlayback, PersistenceManager, PersistentDomain, PlaybackConfig,
    PlaybackError, PlaybackOrchestrator, PlaybackState, RepeatMode, PERSISTED_VERSION,
};
use soul_storage::{MemoryKeyValueStore, SqliteKeyValueStore};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| create_test_track(id, 240)).collect()
}

/// Album 5, 6 playing track 6 paused at 0:37 with repeat and shuffle on
async fn saved_session(backend: &MockBackend) -> (PlaybackOrchestrator, Vec<u8>) {
    let (mut orchestrator, _) = create_orchestrator(backend, MockCatalog::default());
    orchestrator
        .play_tracks(tracks(&["5", "6"]), Some(TrackListId::new("album-1")))
        .await
        .unwrap();
    orchestrator.play_next().await.unwrap();
    orchestrator.seek(37).await.unwrap();
    orchestrator.pause().await.unwrap();
    orchestrator.set_repeat(RepeatMode::Queue);
    orchestrator.set_shuffle(true);

    let blob = orchestrator.serialize_blob().unwrap();
    (orchestrator, blob)
}

// ===== Capture and exhaust =====

#[tokio::test]
async fn test_restore_reloads_current_entry_paused() {
    let (saved, blob) = saved_session(&MockBackend::new()).await;

    let backend = MockBackend::new();
    let catalog = MockCatalog::with_tracks(&tracks(&["5", "6"]));
    let (mut restored, _) = create_orchestrator(&backend, catalog);
    restored.restore_blob(&blob).await.unwrap();

    let session = restored.session();
    assert_eq!(session.state, PlaybackState::Paused);
    assert_eq!(session.current_entry, saved.session().current_entry);
    assert_eq!(session.progress_seconds, Some(37));
    assert_eq!(session.current_track_list, Some(TrackListId::new("album-1")));
    assert_eq!(session.repeat_mode, RepeatMode::Queue);
    assert!(session.shuffle_enabled);

    let order = |o: &PlaybackOrchestrator| -> Vec<_> { o.queue().iter().map(|e| e.id()).collect() };
    assert_eq!(order(&restored), order(&saved));

    // Loaded and positioned, never started
    assert_eq!(backend.created(), 1);
    assert_eq!(backend.provider_id(0), "track-6");
    assert_eq!(
        backend.calls_for(0),
        vec![Call::ChangeVolume(80, 100), Call::Seek(37)]
    );
}

#[tokio::test]
async fn test_restore_is_ignored_while_playing() {
    let (_, blob) = saved_session(&MockBackend::new()).await;

    let backend = MockBackend::new();
    let catalog = MockCatalog::with_tracks(&tracks(&["5", "6"]));
    let (mut orchestrator, _) = create_orchestrator(&backend, catalog);
    orchestrator
        .play_track(create_test_track("9", 120))
        .await
        .unwrap();
    let before = orchestrator.snapshot();

    let outcome = orchestrator
        .exhaust(PersistedPlayback::from_bytes(&blob).unwrap())
        .await
        .unwrap();

    assert_eq!(outcome, ExhaustOutcome::SkippedLiveSession);
    assert_eq!(orchestrator.snapshot(), before);
    assert_eq!(backend.created(), 1);
}

#[tokio::test]
async fn test_unresolvable_entries_are_dropped() {
    let (mut saved, _) = create_orchestrator(&MockBackend::new(), MockCatalog::default());
    saved
        .play_tracks(tracks(&["5", "6", "7"]), None)
        .await
        .unwrap();
    saved.pause().await.unwrap();
    let persisted = PersistedPlayback::capture(&saved.snapshot());

    // 6 is gone, 7 cannot be looked up right now
    let catalog = MockCatalog::with_tracks(&tracks(&["5", "7"]));
    catalog.fail("track-7");
    let backend = MockBackend::new();
    let (mut restored, _) = create_orchestrator(&backend, catalog);

    let outcome = restored.exhaust(persisted).await.unwrap();

    assert_eq!(
        outcome,
        ExhaustOutcome::Restored {
            entries: 1,
            dropped: 2,
            loaded: saved.session().current_entry,
        }
    );
    assert_eq!(restored.queue().len(), 1);
    assert_eq!(restored.session().state, PlaybackState::Paused);
}

#[tokio::test]
async fn test_dropped_current_entry_leaves_session_stopped() {
    let (_, blob) = saved_session(&MockBackend::new()).await;

    let backend = MockBackend::new();
    let (mut restored, _) = create_orchestrator(&backend, MockCatalog::with_tracks(&tracks(&["5"])));
    let outcome = restored
        .exhaust(PersistedPlayback::from_bytes(&blob).unwrap())
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ExhaustOutcome::Restored {
            entries: 1,
            dropped: 1,
            loaded: None
        }
    ));
    assert_eq!(restored.session().state, PlaybackState::Stopped);
    assert_eq!(restored.session().current_entry, None);
    assert_eq!(backend.created(), 0);
}

#[tokio::test]
async fn test_entries_added_after_restore_get_fresh_ids() {
    let (saved, blob) = saved_session(&MockBackend::new()).await;
    let highest = saved.queue().iter().map(|e| e.id()).max().unwrap();

    let (mut restored, _) = create_orchestrator(
        &MockBackend::new(),
        MockCatalog::with_tracks(&tracks(&["5", "6"])),
    );
    restored.restore_blob(&blob).await.unwrap();

    let added = restored.enqueue(tracks(&["8"]), None);
    assert!(added[0] > highest);
}

#[tokio::test]
async fn test_restored_volume_is_clamped_to_config() {
    let (mut saved, _) = create_orchestrator(&MockBackend::new(), MockCatalog::default());
    saved.change_volume(90).await.unwrap();
    saved.mute().await.unwrap();
    let persisted = PersistedPlayback::capture(&saved.snapshot());

    let config = PlaybackConfig {
        default_volume: 30,
        volume_max: 50,
        ..PlaybackConfig::default()
    };
    let (mut restored, _) =
        create_orchestrator_with(&MockBackend::new(), MockCatalog::default(), config);
    restored.exhaust(persisted).await.unwrap();

    let volume = restored.session().volume;
    assert_eq!(volume.current, 50);
    assert_eq!(volume.max, 50);
    assert!(volume.muted);
}

#[test]
fn test_blob_with_unknown_version_is_rejected() {
    let mut persisted = PersistedPlayback::capture(&Default::default());
    persisted.version = PERSISTED_VERSION + 1;
    let bytes = serde_json::to_vec(&persisted).unwrap();

    assert!(matches!(
        PersistedPlayback::from_bytes(&bytes),
        Err(PlaybackError::InvalidPersistedState(_))
    ));
}

// ===== Persistence manager =====

#[tokio::test]
async fn test_manager_saves_and_restores() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let manager = PersistenceManager::new(store.clone(), &PlaybackConfig::default());

    let (saved, _) = saved_session(&MockBackend::new()).await;
    manager.save(&saved).await.unwrap();
    assert_eq!(store.write_count(), 1);

    let (mut restored, _) = create_orchestrator(
        &MockBackend::new(),
        MockCatalog::with_tracks(&tracks(&["5", "6"])),
    );
    let mut domains: [&mut dyn PersistentDomain; 1] = [&mut restored];
    let report = manager.restore_all(&mut domains).await;

    assert!(report.is_clean());
    assert_eq!(report.restored, vec!["playback".to_string()]);
    assert_eq!(restored.session().current_entry, saved.session().current_entry);
}

#[tokio::test]
async fn test_manager_reports_missing_and_invalid_blobs() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let manager = PersistenceManager::new(store.clone(), &PlaybackConfig::default());
    let (mut orchestrator, _) = create_orchestrator(&MockBackend::new(), MockCatalog::default());

    let mut domains: [&mut dyn PersistentDomain; 1] = [&mut orchestrator];
    let report = manager.restore_all(&mut domains).await;
    assert_eq!(report.missing, vec!["playback".to_string()]);
    assert!(report.is_clean());

    store.save("playback", b"{ not json").await.unwrap();
    let mut domains: [&mut dyn PersistentDomain; 1] = [&mut orchestrator];
    let report = manager.restore_all(&mut domains).await;
    assert_eq!(report.failed, vec!["playback".to_string()]);
    assert!(!report.is_clean());
    assert_eq!(orchestrator.session().state, PlaybackState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_restore_over_budget_resets_domain() {
    let (_, blob) = saved_session(&MockBackend::new()).await;
    let store = Arc::new(MemoryKeyValueStore::new());
    store.save("playback", &blob).await.unwrap();

    let config = PlaybackConfig {
        restore_budget_ms: 100,
        ..PlaybackConfig::default()
    };
    let manager = PersistenceManager::new(store, &config);
    let catalog = MockCatalog::with_tracks(&tracks(&["5", "6"])).with_delay(Duration::from_secs(1));
    let (mut orchestrator, _) = create_orchestrator_with(&MockBackend::new(), catalog, config);

    let mut domains: [&mut dyn PersistentDomain; 1] = [&mut orchestrator];
    let report = manager.restore_all(&mut domains).await;

    assert!(report.timed_out);
    assert!(report.restored.is_empty());
    assert!(orchestrator.queue().is_empty());
    assert_eq!(orchestrator.session().state, PlaybackState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_autosave_coalesces_bursts() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let config = PlaybackConfig {
        save_throttle_ms: 1_000,
        ..PlaybackConfig::default()
    };
    let manager = PersistenceManager::new(store.clone(), &config);

    let backend = MockBackend::new();
    let (mut orchestrator, _) =
        create_orchestrator_with(&backend, MockCatalog::default(), config);
    let autosave = manager.spawn_autosave("playback", orchestrator.subscribe());

    orchestrator
        .play_tracks(tracks(&["1", "2"]), None)
        .await
        .unwrap();
    orchestrator.seek(12).await.unwrap();
    orchestrator.pause().await.unwrap();
    orchestrator.set_repeat(RepeatMode::Track);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(store.write_count(), 1);

    let blob = store.load("playback").await.unwrap().unwrap();
    let persisted = PersistedPlayback::from_bytes(&blob).unwrap();
    assert_eq!(persisted.state, PlaybackState::Paused);
    assert_eq!(persisted.progress_seconds, 12);
    assert_eq!(persisted.repeat_mode, RepeatMode::Track);
    assert_eq!(persisted.queue.len(), 2);

    drop(orchestrator);
    autosave.await.unwrap();
}

#[tokio::test]
async fn test_sqlite_store_round_trip() {
    let store = Arc::new(SqliteKeyValueStore::in_memory().await.unwrap());
    let manager = PersistenceManager::new(store.clone(), &PlaybackConfig::default());

    let (saved, _) = saved_session(&MockBackend::new()).await;
    manager.flush("playback", &saved.snapshot()).await.unwrap();
    assert!(store.load("playback").await.unwrap().is_some());

    let backend = MockBackend::new();
    let (mut restored, _) =
        create_orchestrator(&backend, MockCatalog::with_tracks(&tracks(&["5", "6"])));
    let mut domains: [&mut dyn PersistentDomain; 1] = [&mut restored];
    let report = manager.restore_all(&mut domains).await;

    assert!(report.is_clean());
    assert_eq!(restored.session().progress_seconds, Some(37));
    assert_eq!(backend.count(Call::Play), 0);
}
