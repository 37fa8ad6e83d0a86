use test_log::test;
use valet::Registry;

#[test]
fn counter_mints_sequential_identifiers() -> valet::Result<()> {
    let folder = tempfile::tempdir()?;
    let root = folder.path();

    let registry = Registry::new(root);
    registry.create_countable(root)?;
    assert!(registry.is_countable(root));

    for expected in 2..=4_u64 {
        let id = registry.next_id(root)?;

        assert_eq!(expected, valet::base36::decode(id.fragment().as_str())?);

        let dir = root.join(id.path());
        assert!(dir.is_dir());

        // the identity sentinel is written under the identifier's lock,
        // and the identifier comes back unlocked
        let identity = std::fs::read_to_string(dir.join(valet::file::IDENTIFIER_FILE))?;
        assert_eq!(id.to_string(), identity);
        assert!(!dir.join(valet::file::LOCK_FILE).exists());
    }

    assert_eq!("000004", registry.last_id(root)?.fragment().as_str());

    Ok(())
}

#[test]
fn uncountable_database_falls_back_to_random_minting() -> valet::Result<()> {
    let folder = tempfile::tempdir()?;
    let root = folder.path();

    let registry = Registry::new(root);
    assert!(!registry.is_countable(root));

    let id = registry.next_id(root)?;
    assert_eq!(6, id.fragment().len());
    assert!(root.join(id.path()).is_dir());

    Ok(())
}
