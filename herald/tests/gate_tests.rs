#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use herald::{KeyGate, KeySets};
use pretty_assertions::assert_eq;

fn gate_in(dir: &tempfile::TempDir, seed: &[&str]) -> KeyGate {
    KeyGate::new(
        dir.path().join("access_keys.json"),
        seed.iter().map(ToString::to_string).collect(),
    )
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_absent_file_is_created_from_seed() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_in(&dir, &["SEEDSEEDSEEDSEED"]);

    assert_eq!(
        gate.list().await.unwrap(),
        KeySets {
            active: vec!["SEEDSEEDSEEDSEED".into()],
            used: Vec::new(),
        }
    );
    assert!(gate.path().exists());
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_key_is_single_use() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_in(&dir, &["SEEDSEEDSEEDSEED"]);

    let first = gate.validate("SEEDSEEDSEEDSEED").await.unwrap();
    assert!(first.valid);
    assert_eq!(first.message, "Key activated");

    let second = gate.validate("SEEDSEEDSEEDSEED").await.unwrap();
    assert!(!second.valid);
    assert_eq!(second.message, "Key has already been used");

    let unknown = gate.validate("NOPENOPENOPENOPE").await.unwrap();
    assert!(!unknown.valid);
    assert_eq!(unknown.message, "Invalid key");

    let keys = gate.list().await.unwrap();
    assert!(keys.active.is_empty());
    assert_eq!(keys.used, vec!["SEEDSEEDSEEDSEED".to_string()]);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_issue_hundred_distinct_keys() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_in(&dir, &[]);

    let earlier = gate.issue(5).await.unwrap();
    gate.validate(&earlier[0]).await.unwrap();

    let issued = gate.issue(100).await.unwrap();
    assert_eq!(issued.len(), 100);

    let distinct: HashSet<_> = issued.iter().collect();
    assert_eq!(distinct.len(), 100);
    for key in &earlier {
        assert!(!distinct.contains(key));
    }

    let keys = gate.list().await.unwrap();
    assert_eq!(keys.active.len(), 104);
    assert_eq!(keys.used.len(), 1);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_state_survives_new_gate() {
    let dir = tempfile::tempdir().unwrap();
    let issued = gate_in(&dir, &[]).issue(1).await.unwrap();

    let reopened = gate_in(&dir, &[]);
    assert!(reopened.validate(&issued[0]).await.unwrap().valid);
    assert!(!gate_in(&dir, &[]).validate(&issued[0]).await.unwrap().valid);
}

#[tokio::test(flavor = "multi_thread")]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_concurrent_redemption_activates_once() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate_in(&dir, &["RACERACERACERACE"]);

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move { gate.validate("RACERACERACERACE").await.unwrap() })
        })
        .collect();

    let mut activated = 0;
    for attempt in attempts {
        if attempt.await.unwrap().valid {
            activated += 1;
        }
    }
    assert_eq!(activated, 1);
}
