use std::collections::BTreeMap;
use std::error::Error;

use resmirror::errors::MirrorError;
use resmirror::source::LabelSelector;

type TestResult = Result<(), Box<dyn Error>>;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_empty_selector_matches_everything() -> TestResult {
    let selector: LabelSelector = "".parse()?;

    assert!(selector.is_empty());
    assert!(selector.matches(&labels(&[])));
    assert!(selector.matches(&labels(&[("a", "b")])));
    assert_eq!(selector, LabelSelector::everything());
    Ok(())
}

#[test]
fn test_equality_and_inequality_terms() -> TestResult {
    let selector: LabelSelector = "app=web, tier==front,env!=prod".parse()?;

    assert!(selector.matches(&labels(&[("app", "web"), ("tier", "front")])));
    assert!(selector.matches(&labels(&[("app", "web"), ("tier", "front"), ("env", "dev")])));
    assert!(!selector.matches(&labels(&[("app", "web"), ("tier", "front"), ("env", "prod")])));
    assert!(!selector.matches(&labels(&[("app", "api"), ("tier", "front")])));
    assert!(!selector.matches(&labels(&[("app", "web")])));
    Ok(())
}

#[test]
fn test_existence_terms() -> TestResult {
    let selector: LabelSelector = "managed,!legacy".parse()?;

    assert!(selector.matches(&labels(&[("managed", "")])));
    assert!(!selector.matches(&labels(&[("managed", "yes"), ("legacy", "1")])));
    assert!(!selector.matches(&labels(&[])));
    Ok(())
}

#[test]
fn test_display_is_normalised() -> TestResult {
    let selector: LabelSelector = " app == web ,!legacy ".parse()?;
    assert_eq!(selector.to_string(), "app=web,!legacy");
    Ok(())
}

#[test]
fn test_set_based_selectors_are_rejected() {
    match "env in (prod,dev)".parse::<LabelSelector>() {
        Err(MirrorError::ConfigError(msg)) => assert!(msg.contains("set-based")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_invalid_terms_are_rejected() {
    for bad in ["=web", "app=we b", "a pp", "!"] {
        assert!(bad.parse::<LabelSelector>().is_err(), "{bad:?} should not parse");
    }
}
