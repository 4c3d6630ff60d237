// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Allow/deny glob policies.
//!
//! Pattern syntax is shell globbing: `*` matches any run of characters
//! except `/`, `?` matches one, `[a-z]` and `[!a-z]` are character
//! classes. A path is permitted iff it matches at least one allow pattern
//! and no deny pattern; deny wins. All policy decisions are pure functions
//! with no side effects.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::error::AclError;

/// A named policy's pattern lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
	#[serde(default)]
	pub allow: Vec<String>,
	#[serde(default)]
	pub deny: Vec<String>,
}

impl Policy {
	pub fn new(allow: Vec<String>, deny: Vec<String>) -> Self {
		Self { allow, deny }
	}

	/// Evaluates the policy against a request path.
	///
	/// The path is normalized first; patterns never see duplicate or
	/// trailing slashes.
	pub fn verify(&self, path: &str) -> Result<(), AclError> {
		let path = normalize_path(path);
		for pattern in &self.deny {
			if matches(pattern, &path)? {
				return Err(AclError::Forbidden);
			}
		}
		for pattern in &self.allow {
			if matches(pattern, &path)? {
				return Ok(());
			}
		}
		Err(AclError::Forbidden)
	}
}

/// Matches a single glob pattern against a candidate string.
///
/// `*`, `?`, and character classes never match `/`.
pub fn matches(pattern: &str, candidate: &str) -> Result<bool, AclError> {
	const OPTIONS: MatchOptions = MatchOptions {
		case_sensitive: true,
		require_literal_separator: true,
		require_literal_leading_dot: false,
	};
	let pattern = Pattern::new(pattern).map_err(|_| AclError::InvalidPattern)?;
	Ok(pattern.matches_with(candidate, OPTIONS))
}

/// Validates pattern syntax without matching anything.
pub fn validate_pattern(pattern: &str) -> Result<(), AclError> {
	Pattern::new(pattern)
		.map(|_| ())
		.map_err(|_| AclError::InvalidPattern)
}

/// Collapses duplicate slashes and trims trailing slashes, keeping the
/// root untouched.
pub fn normalize_path(path: &str) -> String {
	let mut normalized = String::with_capacity(path.len());
	let mut last_was_slash = false;
	for c in path.chars() {
		if c == '/' {
			if !last_was_slash {
				normalized.push('/');
			}
			last_was_slash = true;
		} else {
			normalized.push(c);
			last_was_slash = false;
		}
	}
	while normalized.len() > 1 && normalized.ends_with('/') {
		normalized.pop();
	}
	normalized
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deny_takes_precedence() {
		let policy = Policy::new(
			vec!["/v1/key/list/*".to_string()],
			vec!["/v1/key/list/my-*".to_string()],
		);
		assert_eq!(policy.verify("/v1/key/list/my-foo"), Err(AclError::Forbidden));
		assert_eq!(policy.verify("/v1/key/list/other"), Ok(()));
	}

	#[test]
	fn no_allow_match_is_forbidden() {
		let policy = Policy::new(vec!["/v1/key/create/*".to_string()], vec![]);
		assert_eq!(policy.verify("/v1/key/delete/k"), Err(AclError::Forbidden));
	}

	#[test]
	fn empty_policy_forbids_everything() {
		let policy = Policy::default();
		assert_eq!(policy.verify("/version"), Err(AclError::Forbidden));
	}

	#[test]
	fn star_does_not_cross_slashes() {
		let policy = Policy::new(vec!["/v1/key/*".to_string()], vec![]);
		assert_eq!(policy.verify("/v1/key/create/name"), Err(AclError::Forbidden));
		assert_eq!(policy.verify("/v1/key/create"), Ok(()));
	}

	#[test]
	fn question_mark_matches_exactly_one_character() {
		assert!(matches("my-key?", "my-key1").unwrap());
		assert!(!matches("my-key?", "my-key").unwrap());
		assert!(!matches("my-key?", "my-key12").unwrap());
	}

	#[test]
	fn character_classes() {
		assert!(matches("my-key_2020-0[1-4]-[0-1][0-9]", "my-key_2020-02-12").unwrap());
		assert!(!matches("my-key_2020-0[1-4]-[0-1][0-9]", "my-key_2020-05-01").unwrap());
		assert!(matches("[!a]bc", "xbc").unwrap());
		assert!(!matches("[!a]bc", "abc").unwrap());
	}

	#[test]
	fn malformed_pattern_is_an_error() {
		assert_eq!(matches("[", "x"), Err(AclError::InvalidPattern));
	}

	#[test]
	fn normalization() {
		assert_eq!(normalize_path("/v1//key///list/x/"), "/v1/key/list/x");
		assert_eq!(normalize_path("/"), "/");
		assert_eq!(normalize_path("//"), "/");
		assert_eq!(normalize_path("/version"), "/version");
	}

	#[test]
	fn patterns_match_normalized_paths() {
		let policy = Policy::new(vec!["/v1/key/create/*".to_string()], vec![]);
		assert_eq!(policy.verify("//v1//key/create/name/"), Ok(()));
	}
}
