//! Upgrade label canonicalization.
//!
//! Labels arrive from an external text recognizer and carry jitter: stray
//! whitespace, rank suffixes ("Lv. 3", "IV"), the occasional misread glyph.
//! Canonicalizing before store lookups keeps one upgrade's history under one
//! key.

use std::sync::LazyLock;

use regex::Regex;

static RANK_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)(?:\s*(?:lv|lvl|level)\.?\s*\d+|\s+[ivx]{1,4})\s*$").expect("regex")
});

/// Minimum label length before fuzzy matching applies. Short labels ("Ice",
/// "Axe") are too close to each other edit-distance-wise to merge safely.
const FUZZY_MIN_LEN: usize = 5;
const FUZZY_MAX_DISTANCE: usize = 2;

/// Collapse whitespace and strip a trailing rank marker.
pub fn canonicalize(raw: &str) -> String {
	let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
	RANK_SUFFIX.replace(&collapsed, "").trim().to_string()
}

/// Find the known label the needle most plausibly is: an exact
/// (case-insensitive) match, or the closest key within a small edit distance.
pub fn best_match<'a>(needle: &str, keys: impl Iterator<Item = &'a str>) -> Option<&'a str> {
	let needle_lower = needle.to_lowercase();
	let mut closest: Option<(usize, &'a str)> = None;

	for key in keys {
		let key_lower = key.to_lowercase();
		if key_lower == needle_lower {
			return Some(key);
		}

		if needle.chars().count() < FUZZY_MIN_LEN {
			continue;
		}

		let distance = levenshtein::levenshtein(&needle_lower, &key_lower);
		if distance <= FUZZY_MAX_DISTANCE && closest.is_none_or(|(best, _)| distance < best) {
			closest = Some((distance, key));
		}
	}

	closest.map(|(_, key)| key)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_rank_suffixes() {
		assert_eq!(canonicalize("Fireball Lv. 3"), "Fireball");
		assert_eq!(canonicalize("Fireball lvl 10"), "Fireball");
		assert_eq!(canonicalize("Magic Bolt IV"), "Magic Bolt");
		assert_eq!(canonicalize("  Frost   Nova  "), "Frost Nova");
	}

	#[test]
	fn plain_labels_pass_through() {
		assert_eq!(canonicalize("Pierce"), "Pierce");
		assert_eq!(canonicalize("Option 1"), "Option 1");
	}

	#[test]
	fn fuzzy_match_absorbs_recognition_jitter() {
		let keys = ["Fireball", "Frost Nova"];
		assert_eq!(best_match("Firebal1", keys.iter().copied()), Some("Fireball"));
		assert_eq!(best_match("frost nova", keys.iter().copied()), Some("Frost Nova"));
	}

	#[test]
	fn short_labels_never_fuzzy_match() {
		let keys = ["Axe"];
		assert_eq!(best_match("Ice", keys.iter().copied()), None);
	}
}
