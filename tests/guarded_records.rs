use test_log::test;
use valet::Registry;

#[test]
fn record_round_trip_under_lock() -> valet::Result<()> {
    let folder = tempfile::tempdir()?;
    let root = folder.path();

    let registry = Registry::new(root);
    registry.create_countable(root)?;

    let id = registry.next_id(root)?;
    let rendered = id.to_string();
    let manager = registry.database(root);

    let account = br#"{"email":"admin@example.com"}"#;
    manager.write_record(&rendered, "account.json", account)?;

    // the write released its lock on the way out
    assert!(!root.join(id.path()).join(valet::file::LOCK_FILE).exists());

    let loaded = manager.read_record(&rendered, "account.json")?;
    assert_eq!(account.as_slice(), loaded.as_slice());

    Ok(())
}

#[test]
fn record_write_respects_a_held_lock() -> valet::Result<()> {
    let folder = tempfile::tempdir()?;
    let root = folder.path();

    let registry = Registry::new(root);
    let manager = registry.database(root);

    manager.ensure_identifier_directory("2026HELD01")?;
    manager.lock_identifier("2026HELD01")?;

    // the sentinel is held, so the guarded write times out instead of
    // clobbering the holder's view
    assert!(matches!(
        manager.write_record("2026HELD01", "account.json", b"{}"),
        Err(valet::Error::LockTimeout(_))
    ));

    manager.unlock_identifier("2026HELD01")?;
    manager.write_record("2026HELD01", "account.json", b"{}")?;

    Ok(())
}
