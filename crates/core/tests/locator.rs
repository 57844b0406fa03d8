mod common;

use pretty_assertions::assert_eq;
use timeliner_core::driver::Selector;
use timeliner_core::locator::{keys, parse_definition};
use timeliner_core::{HarvestError, SelectorMap, SelectorTable};

#[test]
fn test_builtin_table_maps_every_key() {
    let table = SelectorTable::x_timeline();
    assert_eq!(table.len(), keys::ALL.len());
    for key in keys::ALL {
        assert!(table.resolve(key).is_ok(), "{key} is unmapped");
    }
    assert_eq!(
        table.resolve(keys::POST).unwrap(),
        Selector::css(common::CARD)
    );
}

#[test]
fn test_unknown_key() {
    let err = SelectorTable::x_timeline()
        .resolve("post:nonexistent")
        .unwrap_err();
    assert!(matches!(err, HarvestError::UnknownSelector(ref key) if key == "post:nonexistent"));
}

#[test]
fn test_definition_strategies() {
    assert_eq!(
        parse_definition("k", "By.css =>  div.card ").unwrap(),
        Selector::css("div.card")
    );
    assert_eq!(
        parse_definition("k", "By.id => retry").unwrap(),
        Selector::css("#retry")
    );
    assert_eq!(
        parse_definition("k", "By.testid => tweet").unwrap(),
        Selector::css("[data-testid=\"tweet\"]")
    );
    assert_eq!(
        parse_definition("k", "By.xpath => //article[2]").unwrap(),
        Selector::xpath("//article[2]")
    );
}

#[test]
fn test_malformed_definitions() {
    for definition in ["div.card", "By.css =>   ", "By.name => q"] {
        let err = parse_definition("post:body", definition).unwrap_err();
        assert!(
            matches!(err, HarvestError::InvalidSelector { ref key, .. } if key == "post:body"),
            "{definition}: {err}"
        );
    }
}

#[test]
fn test_file_overrides_merge_onto_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/selectors.toml");
    let overrides = SelectorTable::from_file(&path).unwrap();
    assert_eq!(overrides.len(), 4);

    let table = SelectorTable::x_timeline().merged(overrides);
    assert_eq!(table.len(), keys::ALL.len());
    assert_eq!(table.resolve(keys::POST).unwrap(), Selector::css("div.card"));
    assert_eq!(table.resolve(keys::RETRY_BUTTON).unwrap(), Selector::css("#retry"));
    assert_eq!(
        table.resolve(keys::AUTHOR).unwrap(),
        Selector::xpath(r#".//span[@class="author"]"#)
    );
    assert_eq!(
        table.resolve(keys::BODY).unwrap(),
        Selector::css(r#"[data-testid="tweetText"]"#)
    );
}

#[test]
fn test_toml_rendering_reads_back() {
    let table = SelectorTable::x_timeline();
    let rendered = table.to_toml_string();
    assert!(rendered.contains("[timeline]\n"));
    assert_eq!(SelectorTable::from_toml_str(&rendered).unwrap(), table);
}

#[test]
fn test_toml_shape_errors() {
    let err = SelectorTable::from_toml_str("post = 'By.css => a'").unwrap_err();
    assert!(matches!(err, HarvestError::Config(_)), "{err}");

    let err = SelectorTable::from_toml_str("[post]\nbody = 3").unwrap_err();
    assert!(matches!(err, HarvestError::InvalidSelector { .. }), "{err}");

    let err = SelectorTable::from_toml_str("[post\nbody = ''").unwrap_err();
    assert!(matches!(err, HarvestError::Config(_)), "{err}");
}
