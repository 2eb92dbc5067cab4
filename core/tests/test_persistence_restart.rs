use launchgate_core::store::SledStorage;
use launchgate_core::{ManualClock, ModeStore, OperatingMode};
use std::sync::Arc;

fn open(path: &str, now: f64) -> ModeStore {
    let backend = SledStorage::new(path).unwrap();
    ModeStore::with_clock(Arc::new(backend), Arc::new(ManualClock::new(now)))
}

#[test]
fn test_launch_state_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap();

    // First process: resolve to web and defer the push prompt
    {
        let store = open(path, 1000.0);
        store.set_mode(OperatingMode::WebExperience);
        store.save_destination("https://web.example", 5000.0);
        store.record_push_deferral();
    }
    // store dropped here — sled should flush

    // Second process: decision and cache survived
    {
        let store = open(path, 2000.0);
        assert_eq!(store.get_mode(), OperatingMode::WebExperience);
        let destination = store.get_destination().unwrap();
        assert_eq!(destination.url, "https://web.example");
        assert!(!store.is_destination_expired());
        assert_eq!(store.push_deferred_at(), Some(1000.0));
        assert!(!store.should_offer_push_prompt());
    }
}

#[test]
fn test_reset_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap();

    {
        let store = open(path, 1000.0);
        store.set_mode(OperatingMode::NativeExperience);
        store.record_push_deferral();
        store.reset_all();
    }

    {
        let store = open(path, 1000.0);
        assert_eq!(store.get_mode(), OperatingMode::Undetermined);
        assert!(store.get_destination().is_none());
        assert!(store.should_offer_push_prompt());
    }
}
