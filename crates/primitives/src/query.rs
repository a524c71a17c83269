use indexmap::IndexMap;

/// Decoded query parameters in first-seen order.
pub type QueryParams = IndexMap<String, String>;

/// Decodes an `&`-delimited, percent-encoded `key=value` blob.
///
/// * blank input yields an empty map
/// * empty pairs (`a=1&&b=2`, a trailing `&`) are skipped
/// * a pair without `=` maps its key to an empty value
/// * pairs whose decoded key is empty are skipped
/// * the first occurrence of a key wins; later duplicates are dropped
///
/// `+` is kept literally. Malformed escapes never fail the parse: the
/// decoder keeps them verbatim and invalid UTF-8 is replaced lossily.
pub fn parse_query(raw: Option<&str>) -> QueryParams {
	let mut out = QueryParams::new();
	let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
		return out;
	};

	for pair in raw.split('&').filter(|p| !p.is_empty()) {
		let (name, value) = match pair.split_once('=') {
			Some((name, value)) => (decode_component(name), decode_component(value)),
			None => (decode_component(pair), String::new()),
		};
		if name.is_empty() {
			continue;
		}
		out.entry(name).or_insert(value);
	}

	out
}

/// Percent-decodes one URL or query component with the same best-effort
/// policy as [`parse_query`].
pub fn decode_component(component: &str) -> String {
	String::from_utf8_lossy(&urlencoding::decode_binary(component.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests;
