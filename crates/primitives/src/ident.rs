use std::fmt;

/// Shortest accepted identifier, in bytes.
pub const MIN_IDENTIFIER_LEN: usize = 4;
/// Longest accepted identifier, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Returns true if `s` is a syntactically valid link identifier.
///
/// Valid identifiers are 4 to 64 characters drawn from ASCII letters, digits,
/// `_` and `-`. Every accepted character is one byte, so the byte length is
/// the character length.
pub fn is_valid_identifier(s: &str) -> bool {
	(MIN_IDENTIFIER_LEN..=MAX_IDENTIFIER_LEN).contains(&s.len()) && s.bytes().all(is_identifier_byte)
}

const fn is_identifier_byte(b: u8) -> bool {
	b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// A link identifier that passed [`is_valid_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
	/// Validates `s` and wraps it.
	pub fn parse(s: &str) -> Option<Self> {
		is_valid_identifier(s).then(|| Self(s.to_owned()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for Identifier {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
