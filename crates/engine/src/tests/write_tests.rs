use std::thread;

use anyhow::Result;
use index::AddOrUpdateResult;
use tempfile::tempdir;

use super::helpers::{open_int, test_config};

#[test]
fn upsert_reports_added_then_updated() -> Result<()> {
    let dir = tempdir()?;
    let seg = open_int(&dir.path().join("seg.log"), &test_config())?;
    assert_eq!(seg.upsert(1, 10)?, AddOrUpdateResult::Added);
    assert_eq!(seg.upsert(1, 11)?, AddOrUpdateResult::Updated);
    assert_eq!(seg.get(&1), Some(11));
    assert_eq!(seg.len(), 1);
    assert_eq!(seg.next_op_index(), 2);
    Ok(())
}

#[test]
fn concurrent_upserts_are_all_durable() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("seg.log");
    {
        let seg = open_int(&path, &test_config())?;
        thread::scope(|s| {
            for t in 0..4i64 {
                let seg = &seg;
                s.spawn(move || {
                    for i in 0..500 {
                        let key = i * 4 + t;
                        seg.upsert(key, key * 2).unwrap();
                    }
                });
            }
        });
        assert_eq!(seg.len(), 2000);
        assert_eq!(seg.next_op_index(), 2000);
    }

    let seg = open_int(&path, &test_config())?;
    assert_eq!(seg.len(), 2000);
    for (k, v) in seg.iter() {
        assert_eq!(v, k * 2);
    }
    Ok(())
}

#[test]
fn same_key_races_keep_log_and_index_in_step() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("seg.log");
    let final_values: Vec<(i64, i64)> = {
        let seg = open_int(&path, &test_config())?;
        thread::scope(|s| {
            for t in 0..4i64 {
                let seg = &seg;
                s.spawn(move || {
                    for i in 0..300 {
                        seg.upsert(i % 8, t * 1000 + i).unwrap();
                    }
                });
            }
        });
        seg.iter().collect()
    };

    // Replaying by op index must land on exactly what the index held.
    let seg = open_int(&path, &test_config())?;
    assert_eq!(seg.iter().collect::<Vec<_>>(), final_values);
    Ok(())
}

#[test]
fn frozen_segment_rejects_writes_but_serves_reads() -> Result<()> {
    let dir = tempdir()?;
    let seg = open_int(&dir.path().join("seg.log"), &test_config())?;
    seg.upsert(1, 1)?;

    let handle = seg.freeze().expect("first freeze releases the log");
    handle.join().unwrap();
    assert!(seg.is_frozen());
    assert!(seg.freeze().is_none());

    let err = seg.upsert(2, 2).unwrap_err();
    assert!(err.to_string().contains("failed to append"));
    assert!(matches!(
        err.downcast_ref::<wal::WalError>(),
        Some(wal::WalError::Frozen)
    ));
    assert_eq!(seg.get(&1), Some(1));
    assert!(!seg.contains_key(&2));
    Ok(())
}
