use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use resmirror::controller::{Factory, FactorySettings};
use resmirror::errors::MirrorError;
use resmirror::notifier::Action;
use resmirror::source::{ListOptions, ListWatch, ManifestDirSource, SourceError, WatchEvent};
use resmirror_test_utils::{init_tracing, wait_until, with_timeout, RecordingNotifier};

type TestResult = Result<(), Box<dyn Error>>;

fn include() -> Vec<String> {
    vec!["*.yaml".to_string(), "*.json".to_string()]
}

fn kind_dir(root: &TempDir) -> std::path::PathBuf {
    let dir = root.path().join("pod");
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn pod_yaml(name: &str, app: &str) -> String {
    pod_yaml_in("ns", name, app)
}

fn pod_yaml_in(namespace: &str, name: &str, app: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Pod\nmetadata:\n  name: {name}\n  namespace: {namespace}\n  labels:\n    app: {app}\nspec:\n  image: nginx\n"
    )
}

/// Write via rename so a watcher never sees a half-written manifest.
fn put(dir: &Path, file: &str, contents: &str) {
    let tmp = dir.join(format!(".{file}.tmp"));
    fs::write(&tmp, contents).unwrap();
    fs::rename(&tmp, dir.join(file)).unwrap();
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<WatchEvent>) -> WatchEvent {
    with_timeout(rx.recv()).await.expect("watch stream ended")
}

#[tokio::test]
async fn test_list_reads_matching_manifests_only() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);

    put(&dir, "a.yaml", &pod_yaml("a", "web"));
    put(
        &dir,
        "b.json",
        r#"{"apiVersion":"v1","kind":"Pod","metadata":{"name":"b","namespace":"ns"}}"#,
    );
    put(&dir, "notes.txt", &pod_yaml("ignored", "web"));
    put(&dir, "broken.yaml", "metadata: [unclosed");
    put(&dir, "empty.yaml", "   \n");
    put(&dir, "nameless.yaml", "apiVersion: v1\nkind: Pod\n");

    let source = ManifestDirSource::new(root.path(), "pod", &include())?;
    let list = source.list(&ListOptions::default()).await?;

    let names: Vec<&str> = list.items.iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(list.items.iter().all(|o| o.resource_version().is_some()));
    assert_eq!(list.resource_version, "2");
    Ok(())
}

#[tokio::test]
async fn test_list_applies_label_selector() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    put(&dir, "a.yaml", &pod_yaml("a", "web"));
    put(&dir, "b.yaml", &pod_yaml("b", "db"));

    let source = ManifestDirSource::new(root.path(), "pod", &include())?;
    let options = ListOptions {
        label_selector: "app=db".to_string(),
        ..ListOptions::default()
    };
    let list = source.list(&options).await?;

    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].name(), "b");
    Ok(())
}

#[tokio::test]
async fn test_list_and_watch_honour_namespace() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    put(&dir, "a.yaml", &pod_yaml_in("team-a", "a", "web"));
    put(&dir, "b.yaml", &pod_yaml_in("team-b", "b", "web"));
    put(&dir, "node.yaml", "apiVersion: v1\nkind: Node\nmetadata:\n  name: node-1\n");

    let source = ManifestDirSource::new(root.path(), "pod", &include())?;
    let options = ListOptions {
        namespace: "team-a".to_string(),
        ..ListOptions::default()
    };
    let list = source.list(&options).await?;
    let keys: Vec<String> = list.items.iter().map(|o| o.key()).collect::<Result<_, _>>()?;
    assert_eq!(keys, vec!["team-a/a"]);

    let mut rx = source.watch(&options, &list.resource_version).await?;
    put(&dir, "c.yaml", &pod_yaml_in("team-b", "c", "web"));
    put(&dir, "d.yaml", &pod_yaml_in("team-a", "d", "web"));
    match next_event(&mut rx).await {
        WatchEvent::Added(obj) => assert_eq!(obj.key()?, "team-a/d"),
        other => panic!("expected Added for team-a/d, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_object_declared_twice_survives_removing_one_file() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    put(&dir, "a.yaml", &pod_yaml("x", "web"));
    put(&dir, "b.yaml", &pod_yaml("x", "web"));

    let source = ManifestDirSource::new(root.path(), "pod", &include())?;
    let list = source.list(&ListOptions::default()).await?;
    assert_eq!(list.items.len(), 1);

    let mut rx = source.watch(&ListOptions::default(), &list.resource_version).await?;
    fs::remove_file(dir.join("a.yaml"))?;
    match next_event(&mut rx).await {
        WatchEvent::Modified(obj) => assert_eq!(obj.key()?, "ns/x"),
        other => panic!("expected Modified, got {other:?}"),
    }

    fs::remove_file(dir.join("b.yaml"))?;
    match next_event(&mut rx).await {
        WatchEvent::Deleted(obj) => assert_eq!(obj.key()?, "ns/x"),
        other => panic!("expected Deleted, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_unchanged_directory_keeps_its_version() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    put(&dir, "a.yaml", &pod_yaml("a", "web"));

    let source = ManifestDirSource::new(root.path(), "pod", &include())?;
    let first = source.list(&ListOptions::default()).await?;
    let second = source.list(&ListOptions::default()).await?;
    assert_eq!(first.resource_version, second.resource_version);

    put(&dir, "a.yaml", &pod_yaml("a", "api"));
    let third = source.list(&ListOptions::default()).await?;
    assert_ne!(third.resource_version, second.resource_version);
    Ok(())
}

#[tokio::test]
async fn test_watch_from_old_version_is_expired() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    kind_dir(&root);

    let source = ManifestDirSource::new(root.path(), "pod", &include())?;
    let list = source.list(&ListOptions::default()).await?;

    match source.watch(&ListOptions::default(), "999").await {
        Err(SourceError::Expired(_)) => {}
        Err(e) => panic!("expected Expired, got {e:?}"),
        Ok(_) => panic!("expected Expired, got a stream"),
    }
    assert!(source.watch(&ListOptions::default(), &list.resource_version).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_watch_reports_file_changes() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    let source = ManifestDirSource::new(root.path(), "pod", &include())?;

    let list = source.list(&ListOptions::default()).await?;
    let mut rx = source.watch(&ListOptions::default(), &list.resource_version).await?;

    put(&dir, "x.yaml", &pod_yaml("x", "web"));
    match next_event(&mut rx).await {
        WatchEvent::Added(obj) => assert_eq!(obj.key()?, "ns/x"),
        other => panic!("expected Added, got {other:?}"),
    }

    put(&dir, "x.yaml", &pod_yaml("x", "api"));
    match next_event(&mut rx).await {
        WatchEvent::Modified(obj) => {
            assert_eq!(obj.metadata.labels.get("app").map(String::as_str), Some("api"))
        }
        other => panic!("expected Modified, got {other:?}"),
    }

    fs::remove_file(dir.join("x.yaml"))?;
    match next_event(&mut rx).await {
        WatchEvent::Deleted(obj) => assert_eq!(obj.name(), "x"),
        other => panic!("expected Deleted, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_bad_include_glob_is_a_config_error() {
    match ManifestDirSource::new("/tmp", "pod", &["[".to_string()]) {
        Err(MirrorError::ConfigError(msg)) => assert!(msg.contains("include glob")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_controller_over_manifest_directory() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    put(&dir, "a.yaml", &pod_yaml("a", "web"));

    let source = Arc::new(ManifestDirSource::new(root.path(), "pod", &include())?);
    let notifier = Arc::new(RecordingNotifier::new());
    let factory = Factory::new(FactorySettings::default());
    let controller = factory.new_controller(source, notifier.clone(), "pod");

    controller.start();
    wait_until("initial add", || notifier.len() == 1).await;

    put(&dir, "b.yaml", &pod_yaml("b", "web"));
    wait_until("watched add", || notifier.len() == 2).await;
    fs::remove_file(dir.join("a.yaml"))?;
    wait_until("watched delete", || notifier.len() == 3).await;

    with_timeout(controller.stop()).await;

    assert_eq!(notifier.actions_for("ns/a"), vec![Action::Add, Action::Delete]);
    assert_eq!(notifier.actions_for("ns/b"), vec![Action::Add]);
    Ok(())
}

#[tokio::test]
async fn test_renaming_a_manifest_keeps_the_object() -> TestResult {
    init_tracing();
    let root = TempDir::new()?;
    let dir = kind_dir(&root);
    put(&dir, "a.yaml", &pod_yaml("a", "web"));

    let source = Arc::new(ManifestDirSource::new(root.path(), "pod", &include())?);
    let notifier = Arc::new(RecordingNotifier::new());
    let factory = Factory::new(FactorySettings::default());
    let controller = factory.new_controller(source, notifier.clone(), "pod");

    controller.start();
    wait_until("initial add", || notifier.len() == 1).await;

    fs::rename(dir.join("a.yaml"), dir.join("b.yaml"))?;
    wait_until("rename observed", || notifier.len() == 2).await;
    // Give a spurious delete the chance to show up.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    wait_until("idle", || controller.is_idle()).await;

    assert_eq!(notifier.actions_for("ns/a"), vec![Action::Add, Action::Update]);
    assert!(controller.store().contains("ns/a"));

    with_timeout(controller.stop()).await;
    Ok(())
}
