//! Gateway return URL handling.
//!
//! When the gateway redirects the browser back, the return URL carries the
//! order identifier and a one-time verification token as query parameters.
//! Both are read exactly once at session start; the sanitizer then produces
//! the address to display with those parameters stripped, so an abandoned
//! or crashed poll never leaves them visible or re-triggers on refresh.
//!
//! Everything here is pure string manipulation over the URL text: kept
//! parameters are preserved byte for byte in their original order, and no
//! navigation semantics are implied.

/// Parameters read once from a gateway return URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReturn {
	/// The gateway order identifier.
	pub order_id: String,
	/// The one-time verification token, if present.
	pub token: Option<String>,
}

impl GatewayReturn {
	/// Reads the order id and token from a return URL.
	///
	/// Parameter name matches are case-sensitive; the first occurrence of
	/// each name wins. Returns None when the order id parameter is missing
	/// or empty, since such a URL is not a gateway return.
	pub fn from_url(url: &str, order_id_param: &str, token_param: &str) -> Option<Self> {
		let query = query_of(url)?;

		let mut order_id = None;
		let mut token = None;
		for (key, value) in query.split('&').map(split_pair) {
			if order_id.is_none() && key == order_id_param {
				order_id = Some(percent_decode(value));
			} else if token.is_none() && key == token_param {
				token = Some(percent_decode(value));
			}
		}

		match order_id {
			Some(id) if !id.is_empty() => Some(Self {
				order_id: id,
				token: token.filter(|t| !t.is_empty()),
			}),
			_ => None,
		}
	}
}

/// Removes the named query parameters from a URL.
///
/// Matches parameter names case-sensitively against the raw (undecoded)
/// key text. Every other parameter keeps its original value and relative
/// order; path and fragment pass through unchanged. When no parameters
/// remain the `?` is dropped as well.
pub fn sanitize(url: &str, names: &[&str]) -> String {
	let (without_fragment, fragment) = match url.split_once('#') {
		Some((head, fragment)) => (head, Some(fragment)),
		None => (url, None),
	};
	let (base, query) = match without_fragment.split_once('?') {
		Some((base, query)) => (base, Some(query)),
		None => (without_fragment, None),
	};

	let mut result = String::with_capacity(url.len());
	result.push_str(base);

	if let Some(query) = query {
		let kept: Vec<&str> = query
			.split('&')
			.filter(|pair| {
				let key = split_pair(pair).0;
				!names.contains(&key)
			})
			.collect();
		if !kept.is_empty() {
			result.push('?');
			result.push_str(&kept.join("&"));
		}
	}

	if let Some(fragment) = fragment {
		result.push('#');
		result.push_str(fragment);
	}

	result
}

/// The query portion of a URL, between `?` and any fragment.
fn query_of(url: &str) -> Option<&str> {
	let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
	without_fragment.split_once('?').map(|(_, query)| query)
}

/// Splits one `key=value` pair; a pair without `=` is a bare key.
fn split_pair(pair: &str) -> (&str, &str) {
	pair.split_once('=').unwrap_or((pair, ""))
}

/// Decodes percent escapes and `+` in a query parameter value.
///
/// Malformed escapes pass through literally rather than erroring; the
/// values involved are opaque identifiers, not user text.
fn percent_decode(value: &str) -> String {
	let bytes = value.as_bytes();
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'%' if i + 2 < bytes.len() => {
				let hex = &value[i + 1..i + 3];
				if let Ok(byte) = u8::from_str_radix(hex, 16) {
					decoded.push(byte);
					i += 3;
					continue;
				}
				decoded.push(b'%');
				i += 1;
			},
			b'+' => {
				decoded.push(b' ');
				i += 1;
			},
			byte => {
				decoded.push(byte);
				i += 1;
			},
		}
	}
	String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_named_parameters_only() {
		let url = "http://h/p?cashfree_order_id=X&token=Y&other=value";
		assert_eq!(
			sanitize(url, &["cashfree_order_id", "token"]),
			"http://h/p?other=value"
		);
	}

	#[test]
	fn preserves_order_and_values() {
		let url = "http://h/p?b=2&token=t&a=1&c=x%20y";
		assert_eq!(sanitize(url, &["token"]), "http://h/p?b=2&a=1&c=x%20y");
	}

	#[test]
	fn drops_question_mark_when_nothing_remains() {
		let url = "http://h/p?token=Y";
		assert_eq!(sanitize(url, &["token"]), "http://h/p");
	}

	#[test]
	fn preserves_path_and_fragment() {
		let url = "http://h/a/b?token=Y&keep=1#section-2";
		assert_eq!(sanitize(url, &["token"]), "http://h/a/b?keep=1#section-2");
	}

	#[test]
	fn match_is_case_sensitive() {
		let url = "http://h/p?Token=Y&token=Z";
		assert_eq!(sanitize(url, &["token"]), "http://h/p?Token=Y");
	}

	#[test]
	fn no_query_passes_through() {
		assert_eq!(sanitize("http://h/p", &["token"]), "http://h/p");
		assert_eq!(sanitize("http://h/p#frag", &["token"]), "http://h/p#frag");
	}

	#[test]
	fn reads_order_id_and_token() {
		let parsed = GatewayReturn::from_url(
			"http://h/p?cashfree_order_id=ord%2D42&token=abc+def&other=1",
			"cashfree_order_id",
			"token",
		)
		.unwrap();
		assert_eq!(parsed.order_id, "ord-42");
		assert_eq!(parsed.token.as_deref(), Some("abc def"));
	}

	#[test]
	fn missing_order_id_yields_none() {
		assert!(GatewayReturn::from_url("http://h/p?other=1", "order_id", "token").is_none());
		assert!(GatewayReturn::from_url("http://h/p?order_id=", "order_id", "token").is_none());
		assert!(GatewayReturn::from_url("http://h/p", "order_id", "token").is_none());
	}

	#[test]
	fn first_occurrence_wins() {
		let parsed =
			GatewayReturn::from_url("http://h/p?order_id=a&order_id=b", "order_id", "token")
				.unwrap();
		assert_eq!(parsed.order_id, "a");
		assert_eq!(parsed.token, None);
	}

	#[test]
	fn token_in_fragment_is_not_a_parameter() {
		let parsed = GatewayReturn::from_url(
			"http://h/p?order_id=a#token=frag",
			"order_id",
			"token",
		)
		.unwrap();
		assert_eq!(parsed.token, None);
	}
}
