//! The corpus's unit of input: an ordered call sequence with lineage and
//! execution bookkeeping (spec §3, §4.3).

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::call::Call;
use crate::client::Client;
use crate::error::FazzError;

/// `{Boring, Interesting, Timeout, Crash}` — the closed set of testcase
/// outcomes (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedStatus {
    Boring,
    Interesting,
    Timeout,
    Crash,
}

impl SeedStatus {
    /// Only `Interesting` and `Crash` are persisted (spec §4.3).
    pub fn is_persisted(self) -> bool {
        matches!(self, SeedStatus::Interesting | SeedStatus::Crash)
    }

    fn file_prefix(self) -> &'static str {
        match self {
            SeedStatus::Interesting => "cov",
            SeedStatus::Crash => "crash",
            SeedStatus::Boring | SeedStatus::Timeout => {
                unreachable!("Boring/Timeout seeds are never saved")
            }
        }
    }
}

/// The tag a mutator appends to a seed's `mutations` history when it
/// transforms a copy (spec §4.3, §4.4).
pub type MutatorTag = String;

/// `S = (calls, mutations, power, exec_count, succ_count, fail_count)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub calls: Vec<Call>,
    pub mutations: Vec<MutatorTag>,
    pub power: NonZeroU32,
    pub exec_count: u64,
    pub succ_count: u64,
    pub fail_count: u64,
}

/// Process-global monotonic index for saved seed filenames (spec §4.3,
/// §6, §9). Guarded trivially: the fuzzer loop is single-threaded.
static SAVE_INDEX: AtomicU64 = AtomicU64::new(0);

impl Seed {
    /// `|calls| >= 1` is an invariant callers must uphold; seeds are always
    /// constructed from an authored, non-empty call list.
    pub fn new(calls: Vec<Call>) -> Self {
        assert!(!calls.is_empty(), "a seed must contain at least one call");
        Self {
            calls,
            mutations: Vec::new(),
            power: NonZeroU32::new(1).unwrap(),
            exec_count: 0,
            succ_count: 0,
            fail_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        false // invariant: |calls| >= 1
    }

    pub fn get(&self, index: usize) -> Option<&Call> {
        self.calls.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Call> {
        self.calls.get_mut(index)
    }

    pub fn set(&mut self, index: usize, call: Call) {
        self.calls[index] = call;
    }

    /// Inserts `call` immediately after `index`.
    pub fn insert_after(&mut self, index: usize, call: Call) {
        self.calls.insert(index + 1, call);
    }

    /// Index of the terminal call, if any. Mutators must preserve this
    /// position (spec §4.4, §8).
    pub fn terminal_index(&self) -> Option<usize> {
        self.calls.iter().position(|call| call.is_last)
    }

    /// Deep, independent clone: execution counters reset to zero, mutation
    /// history (lineage) preserved (spec §3, §8).
    pub fn deep_copy(&self) -> Self {
        Self {
            calls: self.calls.clone(),
            mutations: self.mutations.clone(),
            power: self.power,
            exec_count: 0,
            succ_count: 0,
            fail_count: 0,
        }
    }

    /// Executes the seed's calls in order against `client`. Per-call
    /// `FnExecFailed` is caught and counted; `FnNotFound` propagates (the
    /// seed definition itself is wrong, spec §7). Counters always satisfy
    /// `succ_count + fail_count <= |calls|` (spec §8).
    pub fn execute(&mut self, client: &mut dyn Client) -> Result<(), FazzError> {
        for call in &self.calls {
            self.exec_count += 1;
            match call.execute(client) {
                Ok(()) => self.succ_count += 1,
                Err(FazzError::FnNotFound(name)) => return Err(FazzError::FnNotFound(name)),
                Err(_failed) => self.fail_count += 1,
            }
        }
        Ok(())
    }

    /// Writes the seed to `<dir>/<kind>_<timestamp>_<index07>` using a
    /// stable, self-describing (JSON) serialisation. Only `Interesting` and
    /// `Crash` statuses are persisted (spec §4.3, §6).
    pub fn save(&self, dir: &Path, status: SeedStatus) -> std::io::Result<Option<PathBuf>> {
        if !status.is_persisted() {
            return Ok(None);
        }
        fs::create_dir_all(dir)?;
        let timestamp = local_timestamp();
        let index = SAVE_INDEX.fetch_add(1, Ordering::Relaxed);
        let filename = format!("{}_{timestamp}_{index:07}", status.file_prefix());
        let path = dir.join(filename);
        let payload = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        fs::write(&path, payload)?;
        Ok(Some(path))
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(std::io::Error::other)
    }
}

fn local_timestamp() -> String {
    // Avoids a chrono dependency for a single formatted field; matches the
    // `YYYY-MM-DD-HH-MM-SS` layout from spec §6 using only UTC civil-time
    // arithmetic (days-from-epoch, no leap seconds).
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (days, time_of_day) = (secs / 86_400, secs % 86_400);
    let (hour, min, sec) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);
    let (year, month, day) = civil_from_days(days as i64);
    format!("{year:04}-{month:02}-{day:02}-{hour:02}-{min:02}-{sec:02}")
}

/// Howard Hinnant's `civil_from_days`: days-since-epoch to a proleptic
/// Gregorian (y, m, d), good for any date representable in `i64` days.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Argument;

    fn dummy_seed(len: usize) -> Seed {
        let calls = (0..len)
            .map(|i| Call::new(format!("op{i}"), vec![Argument::integer(i as i64)]))
            .collect();
        Seed::new(calls)
    }

    #[test]
    fn deep_copy_is_independent_and_resets_counters() {
        let mut original = dummy_seed(3);
        original.exec_count = 5;
        original.succ_count = 3;
        original.mutations.push("dup".into());

        let mut copy = original.deep_copy();
        assert_eq!(copy.exec_count, 0);
        assert_eq!(copy.succ_count, 0);
        assert_eq!(copy.mutations, original.mutations);

        copy.calls[0].name = "renamed".into();
        assert_ne!(copy.calls[0].name, original.calls[0].name);
    }

    #[test]
    fn save_only_persists_interesting_and_crash() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dummy_seed(2);
        assert!(seed.save(dir.path(), SeedStatus::Boring).unwrap().is_none());
        assert!(seed.save(dir.path(), SeedStatus::Timeout).unwrap().is_none());
        let path = seed.save(dir.path(), SeedStatus::Interesting).unwrap().unwrap();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("cov_"));
    }

    #[test]
    fn round_trip_preserves_calls() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dummy_seed(4);
        let path = seed.save(dir.path(), SeedStatus::Crash).unwrap().unwrap();
        let reloaded = Seed::load(&path).unwrap();
        assert_eq!(reloaded.calls, seed.calls);
    }

    #[test]
    fn monotonic_index_increments_across_saves() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dummy_seed(1);
        let first = seed.save(dir.path(), SeedStatus::Crash).unwrap().unwrap();
        let second = seed.save(dir.path(), SeedStatus::Crash).unwrap().unwrap();
        assert_ne!(first, second);
    }
}
