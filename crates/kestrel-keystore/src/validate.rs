// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Name and pattern validation.
//!
//! One rule set for key names, policy names, and identity hex strings as
//! they appear in request paths, and a superset for listing patterns.
//! Validation happens before any store I/O.

use std::sync::LazyLock;

use regex::Regex;

static VALID_NAME: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]{1,80}$").expect("hard-coded regex"));

static VALID_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_.*?!\[\]-]{1,80}$").expect("hard-coded regex"));

/// Whether `name` is acceptable as a key or policy name.
pub fn is_valid_name(name: &str) -> bool {
	VALID_NAME.is_match(name)
}

/// Whether `pattern` is acceptable as a listing pattern.
///
/// A pattern is a name with glob metacharacters (`*`, `?`, `[`, `]`, `!`,
/// `.`) allowed; the glob itself is parsed later, at match time.
pub fn is_valid_pattern(pattern: &str) -> bool {
	VALID_PATTERN.is_match(pattern)
}
