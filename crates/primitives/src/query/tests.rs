use proptest::prelude::*;

use super::*;

fn pairs(params: &QueryParams) -> Vec<(&str, &str)> {
	params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[test]
fn first_occurrence_wins() {
	let params = parse_query(Some("a=1&b=2&a=9"));
	assert_eq!(pairs(&params), vec![("a", "1"), ("b", "2")]);
}

#[test]
fn blank_input_is_empty() {
	assert!(parse_query(None).is_empty());
	assert!(parse_query(Some("")).is_empty());
	assert!(parse_query(Some("   ")).is_empty());
}

#[test]
fn key_without_value() {
	assert_eq!(pairs(&parse_query(Some("x"))), vec![("x", "")]);
}

#[test]
fn percent_decodes_keys_and_values() {
	assert_eq!(pairs(&parse_query(Some("k=%26"))), vec![("k", "&")]);
	assert_eq!(pairs(&parse_query(Some("utm%5Fsource=google%20ads"))), vec![("utm_source", "google ads")]);
}

#[test]
fn splits_on_first_equals_only() {
	assert_eq!(pairs(&parse_query(Some("k=a=b"))), vec![("k", "a=b")]);
}

#[test]
fn skips_empty_pairs_and_empty_keys() {
	let params = parse_query(Some("a=1&&=orphan&b=2&"));
	assert_eq!(pairs(&params), vec![("a", "1"), ("b", "2")]);
}

#[test]
fn plus_is_not_a_space() {
	assert_eq!(pairs(&parse_query(Some("q=a+b"))), vec![("q", "a+b")]);
}

#[test]
fn malformed_escapes_do_not_abort() {
	let params = parse_query(Some("bad=%zz&pct=100%&ok=1"));
	assert_eq!(params.get("bad").map(String::as_str), Some("%zz"));
	assert_eq!(params.get("pct").map(String::as_str), Some("100%"));
	assert_eq!(params.get("ok").map(String::as_str), Some("1"));
}

#[test]
fn invalid_utf8_is_replaced_lossily() {
	let params = parse_query(Some("k=%FF&n=2"));
	assert_eq!(params.get("k").map(String::as_str), Some("\u{FFFD}"));
	assert_eq!(params.get("n").map(String::as_str), Some("2"));
}

#[test]
fn install_referrer_shape() {
	let raw = "utm_source=google-play&utm_medium=organic&gclid=Cj0KCQ&sddl_id=abc123";
	let params = parse_query(Some(raw));
	assert_eq!(params.get("utm_source").map(String::as_str), Some("google-play"));
	assert_eq!(params.get("sddl_id").map(String::as_str), Some("abc123"));
	assert_eq!(params.len(), 4);
}

proptest! {
	/// Decoding never panics and never yields an empty key.
	#[test]
	fn prop_never_panics(raw in "[a-z%=&+0-9A-F]{0,40}") {
		let params = parse_query(Some(&raw));
		prop_assert!(params.keys().all(|k| !k.is_empty()));
	}

	/// The value kept for a repeated key is the first one written.
	#[test]
	fn prop_first_write_wins(key in "[a-z]{1,6}", first in "[a-z0-9]{0,6}", second in "[a-z0-9]{0,6}") {
		let raw = format!("{key}={first}&{key}={second}");
		let params = parse_query(Some(&raw));
		prop_assert_eq!(params.get(&key), Some(&first));
		prop_assert_eq!(params.len(), 1);
	}
}
