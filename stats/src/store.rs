//! Durable upgrade statistics.
//!
//! A flat JSON mapping of upgrade label to its observation history, loaded
//! eagerly at startup and rewritten in full after every update. Upgrades are
//! chosen once per level, so the synchronous full-file rewrite is cheap
//! relative to how rarely it happens.

use std::{
	collections::BTreeMap,
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Observation history for one upgrade.
///
/// Invariant: `times_chosen == 0` implies `cumulative_effectiveness == 0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UpgradeRecord {
	pub times_chosen: u32,
	pub cumulative_effectiveness: f64,
}

impl UpgradeRecord {
	/// Mean effectiveness over the times this upgrade was chosen.
	/// `None` for a never-chosen upgrade.
	pub fn average(&self) -> Option<f64> {
		(self.times_chosen > 0).then(|| self.cumulative_effectiveness / self.times_chosen as f64)
	}
}

#[derive(Debug)]
pub struct UpgradeStore {
	path: PathBuf,
	records: BTreeMap<String, UpgradeRecord>,
}

impl UpgradeStore {
	/// Load the store from `path`. A missing file means an empty store on
	/// first run, not an error.
	pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		if !path.exists() {
			return Ok(Self {
				path,
				records: BTreeMap::new(),
			});
		}

		let file = File::open(&path).with_context(|| format!("open store {}", path.display()))?;
		let records = serde_json::from_reader(BufReader::new(file))
			.with_context(|| format!("parse store {}", path.display()))?;

		Ok(Self { path, records })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn record(&self, label: &str) -> Option<&UpgradeRecord> {
		self.records.get(label)
	}

	pub fn labels(&self) -> impl Iterator<Item = &str> {
		self.records.keys().map(String::as_str)
	}

	/// Canonical key for a recognized label: normalized, then fuzzy-matched
	/// against existing keys so recognition jitter doesn't split one
	/// upgrade's history across several entries.
	pub fn resolve_label(&self, raw: &str) -> String {
		let canonical = crate::canonicalize(raw);
		crate::best_match(&canonical, self.records.keys().map(String::as_str))
			.map(str::to_string)
			.unwrap_or(canonical)
	}

	/// Append one observation and synchronously rewrite the whole file.
	///
	/// The in-memory record is updated even when the write fails, so the
	/// caller can warn with the values that should have been saved and keep
	/// running.
	pub fn update(&mut self, label: &str, effectiveness: f64) -> Result<()> {
		let key = self.resolve_label(label);
		let record = self.records.entry(key).or_default();
		record.times_chosen += 1;
		record.cumulative_effectiveness += effectiveness;
		self.save()
	}

	fn save(&self) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)
					.with_context(|| format!("create store dir {}", parent.display()))?;
			}
		}

		let tmp = self.path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("write store temp {}", tmp.display()))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer_pretty(&mut writer, &self.records).context("serialize store")?;
		writer.flush().context("flush store")?;

		// Replace existing file (Windows-friendly).
		if std::fs::rename(&tmp, &self.path).is_err() {
			let _ = std::fs::remove_file(&self.path);
			std::fs::rename(&tmp, &self.path)
				.with_context(|| format!("persist store {}", self.path.display()))?;
		}
		Ok(())
	}

	/// Records sorted by average effectiveness, best first. For operator logs.
	pub fn summary(&self) -> String {
		if self.records.is_empty() {
			return "no upgrade data recorded yet".to_string();
		}

		let mut rows: Vec<(&String, &UpgradeRecord)> = self.records.iter().collect();
		rows.sort_by(|a, b| {
			let avg_a = a.1.average().unwrap_or(0.0);
			let avg_b = b.1.average().unwrap_or(0.0);
			avg_b.partial_cmp(&avg_a).unwrap_or(std::cmp::Ordering::Equal)
		});

		rows.into_iter()
			.map(|(label, record)| {
				format!(
					"{label}: avg {:.2} over {} picks",
					record.average().unwrap_or(0.0),
					record.times_chosen
				)
			})
			.collect::<Vec<_>>()
			.join("\n")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store_in(dir: &tempfile::TempDir) -> UpgradeStore {
		UpgradeStore::load(dir.path().join("upgrades.json")).unwrap()
	}

	#[test]
	fn missing_file_is_an_empty_store() {
		let dir = tempfile::tempdir().unwrap();
		let store = store_in(&dir);
		assert!(store.is_empty());
	}

	#[test]
	fn update_is_monotonic() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = store_in(&dir);

		store.update("Fireball", 1.5).unwrap();
		store.update("Fireball", 2.5).unwrap();

		let record = store.record("Fireball").unwrap();
		assert_eq!(record.times_chosen, 2);
		assert!((record.cumulative_effectiveness - 4.0).abs() < 1e-9);
		assert!((record.average().unwrap() - 2.0).abs() < 1e-9);
	}

	#[test]
	fn round_trip_reloads_an_identical_mapping() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("upgrades.json");

		let mut store = UpgradeStore::load(&path).unwrap();
		store.update("Fireball", 2.0).unwrap();
		store.update("Frost Nova", 0.1).unwrap();
		store.update("Fireball", 1.0).unwrap();

		let reloaded = UpgradeStore::load(&path).unwrap();
		assert_eq!(reloaded.len(), 2);
		assert_eq!(
			reloaded.record("Fireball"),
			store.record("Fireball")
		);
		assert_eq!(
			reloaded.record("Frost Nova"),
			store.record("Frost Nova")
		);
	}

	#[test]
	fn never_chosen_record_has_no_average() {
		let record = UpgradeRecord::default();
		assert_eq!(record.times_chosen, 0);
		assert_eq!(record.cumulative_effectiveness, 0.0);
		assert!(record.average().is_none());
	}

	#[test]
	fn jittered_labels_share_one_history() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = store_in(&dir);

		store.update("Fireball", 1.0).unwrap();
		store.update("Firebal1 Lv. 2", 2.0).unwrap();

		assert_eq!(store.len(), 1);
		assert_eq!(store.record("Fireball").unwrap().times_chosen, 2);
	}
}
