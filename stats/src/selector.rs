//! Upgrade choice scoring.

use crate::UpgradeStore;

/// Score assigned to an upgrade that has never been tried, so untested
/// options are not permanently starved.
pub const EXPLORATION_BONUS: f64 = 0.5;

/// The level-up screen always presents three primary choices.
pub const PRIMARY_CHOICES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
	pub label: String,
	pub index: usize,
}

/// Pick the highest-scoring of (at most) the first three candidates.
///
/// Known upgrades score their historical average; unknown ones score the
/// exploration bonus. Strictly-higher wins, so the first of tied candidates
/// is kept. The returned index is always in `0..3`; with no candidates at
/// all the selection falls back to the first on-screen option.
pub fn select_best(candidates: &[String], store: &UpgradeStore) -> Choice {
	let main = &candidates[..candidates.len().min(PRIMARY_CHOICES)];

	let mut best: Option<(f64, Choice)> = None;
	for (index, raw) in main.iter().enumerate() {
		let label = store.resolve_label(raw);
		let score = store
			.record(&label)
			.and_then(|record| record.average())
			.unwrap_or(EXPLORATION_BONUS);

		if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
			best = Some((score, Choice { label, index }));
		}
	}

	let mut choice = best.map(|(_, choice)| choice).unwrap_or(Choice {
		label: "Option 1".to_string(),
		index: 0,
	});
	if choice.index >= PRIMARY_CHOICES {
		choice.index = 0;
	}
	choice
}

#[cfg(test)]
mod tests {
	use super::*;

	fn empty_store() -> (tempfile::TempDir, UpgradeStore) {
		let dir = tempfile::tempdir().unwrap();
		let store = UpgradeStore::load(dir.path().join("upgrades.json")).unwrap();
		(dir, store)
	}

	fn labels(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn empty_store_picks_the_first_candidate() {
		let (_dir, store) = empty_store();
		let choice = select_best(&labels(&["Fire", "Ice", "Pierce"]), &store);
		assert_eq!(choice, Choice { label: "Fire".to_string(), index: 0 });
	}

	#[test]
	fn proven_upgrade_beats_the_exploration_bonus() {
		let (_dir, mut store) = empty_store();
		store.update("Fire", 1.5).unwrap();
		store.update("Fire", 2.5).unwrap();

		let choice = select_best(&labels(&["Ice", "Fire", "Pierce"]), &store);
		assert_eq!(choice, Choice { label: "Fire".to_string(), index: 1 });
	}

	#[test]
	fn poor_history_loses_to_an_untested_option() {
		let (_dir, mut store) = empty_store();
		store.update("Fire", 0.1).unwrap();

		let choice = select_best(&labels(&["Fire", "Ice", "Pierce"]), &store);
		assert_eq!(choice.label, "Ice");
		assert_eq!(choice.index, 1);
	}

	#[test]
	fn index_stays_in_range_for_any_candidate_count() {
		let (_dir, store) = empty_store();

		for count in [0usize, 1, 2, 3, 7] {
			let names: Vec<String> = (0..count).map(|i| format!("Upgrade {i}")).collect();
			let choice = select_best(&names, &store);
			assert!(choice.index < PRIMARY_CHOICES, "count {count} gave index {}", choice.index);
		}
	}

	#[test]
	fn no_candidates_fall_back_to_the_first_slot() {
		let (_dir, store) = empty_store();
		let choice = select_best(&[], &store);
		assert_eq!(choice, Choice { label: "Option 1".to_string(), index: 0 });
	}

	#[test]
	fn candidates_past_the_third_are_ignored() {
		let (_dir, mut store) = empty_store();
		store.update("Whirlwind", 4.0).unwrap();

		// "Whirlwind" has the best history but sits in slot 4.
		let choice = select_best(&labels(&["Fire", "Ice", "Pierce", "Whirlwind"]), &store);
		assert_eq!(choice.index, 0);
		assert_eq!(choice.label, "Fire");
	}
}
