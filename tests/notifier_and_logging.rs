use std::error::Error;

use tracing::level_filters::LevelFilter;

use resmirror::cli::LogLevel;
use resmirror::errors::MirrorError;
use resmirror::logging::resolve_filter;
use resmirror::notifier::{Action, ChannelNotifier, Notification, Notifier};
use resmirror_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn test_action_parses_and_displays() -> TestResult {
    for action in [Action::Add, Action::Update, Action::Delete] {
        assert_eq!(action.to_string().parse::<Action>()?, action);
    }
    assert_eq!(" DELETE ".parse::<Action>()?, Action::Delete);
    assert!("upsert".parse::<Action>().is_err());
    Ok(())
}

#[test]
fn test_render_has_header_and_document() {
    let upsert = Notification::upsert(
        "ns/web".to_string(),
        "pod",
        Action::Update,
        b"kind: Pod\nmetadata:\n  name: web\n".to_vec(),
    );
    assert_eq!(
        upsert.render(),
        "---\n# update pod ns/web\nkind: Pod\nmetadata:\n  name: web\n"
    );

    let delete = Notification::delete("node-1".to_string(), "node");
    assert_eq!(delete.render(), "---\n# delete node node-1\n");
}

#[tokio::test]
async fn test_channel_notifier_delivers_in_order_and_reports_closure() -> TestResult {
    let (notifier, mut rx) = ChannelNotifier::new(4);

    notifier.send(Notification::delete("a".into(), "pod")).await?;
    notifier.send(Notification::delete("b".into(), "pod")).await?;
    assert_eq!(with_timeout(rx.recv()).await.map(|n| n.key).as_deref(), Some("a"));
    assert_eq!(with_timeout(rx.recv()).await.map(|n| n.key).as_deref(), Some("b"));

    drop(rx);
    match notifier.send(Notification::delete("c".into(), "pod")).await {
        Err(MirrorError::NotifierClosed(key)) => assert_eq!(key, "c"),
        other => panic!("expected NotifierClosed, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_log_filter_priority() {
    // Flag beats env.
    let filter = resolve_filter(Some(LogLevel::Warn), Some("trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

    // Env accepts full directives.
    let filter = resolve_filter(None, Some("resmirror::mirror=trace,info"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

    // Nothing set, blank, or garbage: info.
    for env in [None, Some("  "), Some("resmirror=notalevel")] {
        let filter = resolve_filter(None, env);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO), "{env:?}");
    }
}
