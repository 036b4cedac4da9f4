use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use lessonforge_core::traits::ProgressStore;
use lessonforge_store::{FileUserStore, NewUser};
use tempfile::TempDir;

fn store_with_user(dir: &TempDir) -> Arc<FileUserStore> {
    let store = FileUserStore::open(dir.path()).unwrap().with_hash_cost(4);
    store
        .create_user(NewUser {
            username: "ada".into(),
            password: "password1".into(),
            email: "ada@agency.example.org".into(),
            ..Default::default()
        })
        .unwrap();
    Arc::new(store)
}

#[test]
fn concurrent_progress_updates_keep_the_maximum() {
    let dir = TempDir::new().unwrap();
    let store = store_with_user(&dir);

    let handles: Vec<_> = (1..=8u32)
        .map(|lesson| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.update_progress("ada", lesson).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get_progress("ada").unwrap(), 8);
    assert_eq!(store.completed_lessons("ada").unwrap().len(), 8);
}

#[test]
fn concurrent_scores_keep_the_best() {
    let dir = TempDir::new().unwrap();
    let store = store_with_user(&dir);

    let handles: Vec<_> = [20.0, 90.0, 50.0, 70.0, 10.0]
        .into_iter()
        .map(|score| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .save_quiz_score("ada", 3, score, BTreeMap::new())
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let scores = store.get_quiz_scores("ada").unwrap();
    assert_eq!(scores["3"].score, 90.0);
}

#[test]
fn reopening_sees_saved_state() {
    let dir = TempDir::new().unwrap();
    {
        let store = store_with_user(&dir);
        store.update_progress("ada", 3).unwrap();
    }
    let reopened = FileUserStore::open(dir.path()).unwrap();
    assert_eq!(reopened.get_progress("ada").unwrap(), 3);
    assert!(reopened.verify_credentials("ada", "password1").unwrap());
}
