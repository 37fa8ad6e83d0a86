use std::time::{Duration, Instant};
use test_log::test;
use valet::Registry;

#[test]
fn short_fragments_poll_until_the_deadline() -> valet::Result<()> {
    let folder = tempfile::tempdir()?;
    let root = folder.path();

    let registry = Registry::new(root);
    let manager = registry.database(root);

    // rendered length 6 is never accepted, so the loop runs out the clock
    let started = Instant::now();
    let result = manager.new_identifier(2, 17, Duration::from_millis(300));

    assert!(matches!(result, Err(valet::Error::Timeout)));
    assert!(started.elapsed() >= Duration::from_millis(300));

    Ok(())
}

#[test]
fn three_symbol_fragments_are_the_shortest_accepted() -> valet::Result<()> {
    let folder = tempfile::tempdir()?;
    let root = folder.path();

    let registry = Registry::new(root);

    let id = registry.new_id(root, 3)?;
    assert_eq!(3, id.fragment().len());
    assert_eq!(7, id.to_string().chars().count());

    Ok(())
}
