use camino::Utf8PathBuf;
use station_store::ObjectStore;
use tempdir::TempDir;

use super::*;

fn manager() -> TreeManager {
    TreeManager::new(ObjectStore::in_memory())
}

/// Every (path, bytes) pair reachable from `root`, depth first.
fn collect_files(store: &ObjectStore, root: Cid, prefix: &str) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();

    for (name, entry) in store.ls(root).unwrap() {
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        match entry.kind {
            EntryKind::File => {
                out.push((path, store.get(entry.cid).unwrap().unwrap()));
            }
            EntryKind::Directory => {
                out.extend(collect_files(store, entry.cid, &path));
            }
        }
    }

    out
}

#[tokio::test]
async fn test_insert_sequence_lists_exactly_what_went_in() {
    let tree = manager();

    let inserted = [
        ("nz/2026/02/13/manifest.json", b"{\"x\": 1}\n".to_vec()),
        ("nz/2026/02/13/readings.csv", b"t,v\n0,1\n".to_vec()),
        ("nz/2026/02/14/manifest.json", b"{\"x\": 2}\n".to_vec()),
        ("au/2026/02/13/manifest.json", b"{\"x\": 3}\n".to_vec()),
    ];

    for (path, content) in &inserted {
        let _root = tree.insert(path, content).await.unwrap();
    }

    let root = tree.root().await.unwrap();
    let mut found = collect_files(tree.store(), root, "");
    found.sort();

    let mut expected: Vec<_> = inserted
        .iter()
        .map(|(path, content)| ((*path).to_owned(), content.clone()))
        .collect();
    expected.sort();

    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_old_roots_are_never_altered() {
    let tree = manager();

    let r1 = tree
        .insert("nz/2026/02/13/manifest.json", b"first")
        .await
        .unwrap();

    let before = collect_files(tree.store(), r1, "");

    let r2 = tree
        .insert("nz/2026/02/13/readings.csv", b"second")
        .await
        .unwrap();

    assert_ne!(r1, r2);

    // the pre-insert root still resolves exactly as captured
    assert_eq!(collect_files(tree.store(), r1, ""), before);
    assert_eq!(collect_files(tree.store(), r2, "").len(), 2);
}

#[tokio::test]
async fn test_remove_keeps_the_previous_root_resolvable() {
    let tree = manager();

    let r1 = tree
        .insert("nz/2026/02/13/manifest.json", b"payload")
        .await
        .unwrap();

    let r2 = tree.remove("nz/2026/02/13/manifest.json").await.unwrap();

    assert!(tree
        .store()
        .stat(r2, "nz/2026/02/13/manifest.json")
        .unwrap()
        .is_none());

    let entry = tree
        .store()
        .stat(r1, "nz/2026/02/13/manifest.json")
        .unwrap()
        .unwrap();
    assert_eq!(tree.store().get(entry.cid).unwrap().unwrap(), b"payload");
}

#[tokio::test]
async fn test_double_remove_fails_with_path_not_found() {
    let tree = manager();

    let _root = tree
        .insert("nz/2026/02/13/manifest.json", b"{\"x\": 1}\n")
        .await
        .unwrap();

    tree.remove("nz/2026/02/13/manifest.json").await.unwrap();

    let err = tree
        .remove("nz/2026/02/13/manifest.json")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "path not found: manifest.json");
}

#[tokio::test]
async fn test_reinserting_identical_bytes_reproduces_the_leaf_cid() {
    let tree = manager();
    let path = "nz/2026/02/13/manifest.json";

    let r1 = tree.insert(path, b"{\"x\": 1}\n").await.unwrap();
    let first = tree.store().stat(r1, path).unwrap().unwrap();

    let _r2 = tree.remove(path).await.unwrap();
    let r3 = tree.insert(path, b"{\"x\": 1}\n").await.unwrap();
    let second = tree.store().stat(r3, path).unwrap().unwrap();

    assert_eq!(first.cid, second.cid);
    // and since nothing else changed, the whole root converges too
    assert_eq!(r1, r3);
}

#[tokio::test]
async fn test_first_insert_scenario() {
    let tree = manager();

    let r0 = tree.get_or_create_root().await.unwrap();
    let r1 = tree
        .insert("nz/2026/02/13/manifest.json", b"{\"x\": 1}\n")
        .await
        .unwrap();

    assert_ne!(r0, r1);

    let top = tree.list("").await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "nz");
    assert_eq!(top[0].kind, EntryKind::Directory);

    let day = tree.list("nz/2026/02/13").await.unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].name, "manifest.json");
    assert_eq!(day[0].kind, EntryKind::File);
    assert_eq!(day[0].size, 9);
}

#[tokio::test]
async fn test_insert_replaces_same_named_entry() {
    let tree = manager();
    let path = "nz/2026/02/13/manifest.json";

    let _r1 = tree.insert(path, b"old").await.unwrap();
    let r2 = tree.insert(path, b"new").await.unwrap();

    let entry = tree.store().stat(r2, path).unwrap().unwrap();
    assert_eq!(tree.store().get(entry.cid).unwrap().unwrap(), b"new");

    assert_eq!(tree.list("nz/2026/02/13").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_on_unresolvable_path_is_empty() {
    let tree = manager();

    assert!(tree.list("nowhere").await.unwrap().is_empty());

    let _root = tree
        .insert("nz/2026/02/13/manifest.json", b"x")
        .await
        .unwrap();

    assert!(tree.list("nz/2026/02/99").await.unwrap().is_empty());
    assert!(tree.list("fr/2026/02/13").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_error_conditions() {
    let tree = manager();

    assert!(matches!(
        tree.remove("nz/2026").await.unwrap_err(),
        TreeError::Empty
    ));

    let _root = tree
        .insert("nz/2026/02/13/manifest.json", b"x")
        .await
        .unwrap();

    assert!(matches!(
        tree.remove("").await.unwrap_err(),
        TreeError::CannotRemoveRoot
    ));

    let err = tree
        .remove("nz/1999/02/13/manifest.json")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "path not found: 1999");
}

#[tokio::test]
async fn test_get_or_create_root_is_stable() {
    let tree = manager();

    let r0 = tree.get_or_create_root().await.unwrap();
    assert_eq!(tree.get_or_create_root().await.unwrap(), r0);
    assert_eq!(tree.root().await, Some(r0));
}

#[tokio::test]
async fn test_set_root_adopts_a_persisted_root() {
    let store = ObjectStore::in_memory();

    let producer = TreeManager::new(store.clone());
    let root = producer
        .insert("nz/2026/02/13/manifest.json", b"x")
        .await
        .unwrap();

    let restored = TreeManager::new(store);
    restored.set_root(root).await;

    assert_eq!(restored.list("nz/2026/02/13").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ingest_applies_files_sequentially() {
    let tmp = TempDir::new("station-staging").unwrap();
    let area = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

    std::fs::create_dir_all(area.join("nz/2026/02/13")).unwrap();
    std::fs::write(area.join("nz/2026/02/13/manifest.json"), b"{\"x\": 1}\n").unwrap();
    std::fs::write(area.join("nz/2026/02/13/readings.csv"), b"t,v\n").unwrap();
    std::fs::create_dir_all(area.join("au/2026/02/13")).unwrap();
    std::fs::write(area.join("au/2026/02/13/manifest.json"), b"{\"x\": 2}\n").unwrap();

    let tree = manager();
    let report = tree.ingest_from_staging(&area).await.unwrap();

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.root, tree.root().await.unwrap());

    // every intermediate root is resolvable and each step adds one file
    for (idx, file) in report.files.iter().enumerate() {
        assert_eq!(
            collect_files(tree.store(), file.root, "").len(),
            idx + 1,
            "unexpected file count after {}",
            file.path
        );
    }

    // the last file's root is the final root
    assert_eq!(report.files.last().unwrap().root, report.root);

    let day = tree.list("nz/2026/02/13").await.unwrap();
    assert_eq!(day.len(), 2);
}

#[tokio::test]
async fn test_ingest_of_empty_staging_area_yields_a_root() {
    let tmp = TempDir::new("station-staging").unwrap();
    let area = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

    let tree = manager();
    let report = tree.ingest_from_staging(&area).await.unwrap();

    assert!(report.files.is_empty());
    assert_eq!(Some(report.root), tree.root().await);
}

#[tokio::test]
async fn test_root_file_round_trip() {
    let tmp = TempDir::new("station-home").unwrap();
    let home = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

    assert!(RootFile::load(&home).is_none());

    let root = Cid::hash(b"some root");
    RootFile::save(&home, root).unwrap();

    assert_eq!(RootFile::load(&home), Some(root));

    // a corrupt file reads as "no prior state"
    std::fs::write(home.join(ROOT_FILE), b"not json").unwrap();
    assert!(RootFile::load(&home).is_none());
}
