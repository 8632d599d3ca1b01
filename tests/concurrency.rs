// tests/concurrency.rs

//! Concurrent packaging runs sharing one destination.

mod common;

use artipack::inventory;
use artipack::{PackagePublisher, PackageSpecification};
use common::Sandbox;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

const RUNS: usize = 8;

#[test]
fn test_parallel_runs_get_distinct_sequences() {
    let sandbox = Arc::new(Sandbox::new());
    sandbox.write("data.txt", "shared payload");

    let spec = PackageSpecification::builder("build")
        .base_directory(&sandbox.work)
        .file("data.txt")
        .build()
        .unwrap();
    let publisher = Arc::new(PackagePublisher::new(spec));

    let handles: Vec<_> = (0..RUNS)
        .map(|_| {
            let publisher = Arc::clone(&publisher);
            let sandbox = Arc::clone(&sandbox);
            thread::spawn(move || publisher.run(&sandbox.build()).unwrap().archive_path)
        })
        .collect();

    let paths: BTreeSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let expected: BTreeSet<_> = (1..=RUNS)
        .map(|n| sandbox.artifacts.join(format!("build-{}.zip", n)))
        .collect();
    assert_eq!(paths, expected);

    // Every run is recorded exactly once in both inventories
    let project = inventory::load(&sandbox.project_inventory()).unwrap();
    let build = inventory::load(&sandbox.build_inventory()).unwrap();
    assert_eq!(project.len(), RUNS);
    assert_eq!(build.len(), RUNS);

    let names: BTreeSet<_> = project.iter().map(|r| r.name.clone()).collect();
    assert_eq!(names.len(), RUNS);
}

#[test]
fn test_parallel_single_instance_runs_leave_valid_archive() {
    let sandbox = Arc::new(Sandbox::new());
    sandbox.write("data.txt", "payload");

    let spec = PackageSpecification::builder("nightly")
        .single_instance(true)
        .base_directory(&sandbox.work)
        .file("data.txt")
        .build()
        .unwrap();
    let publisher = Arc::new(PackagePublisher::new(spec));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let publisher = Arc::clone(&publisher);
            let sandbox = Arc::clone(&sandbox);
            thread::spawn(move || publisher.run(&sandbox.build()).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let archive = sandbox.artifacts.join("nightly.zip");
    assert_eq!(common::zip_entries(&archive), vec!["data.txt"]);
    assert_eq!(inventory::load(&sandbox.project_inventory()).unwrap().len(), 4);
}
