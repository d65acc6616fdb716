//! Job-scoped local filenames for staging files inside the engine.
//!
//! Original filenames come from a foreign machine and may contain
//! anything. Every input and output slot is therefore mapped to a
//! generated ASCII name: `job<counter>_input<i><ext>` and
//! `job<counter>_out<i><ext>`, where `<i>` is the position within the
//! job's `inputs`/`outputs` list and `<ext>` is taken from the original
//! name.

use std::collections::BTreeMap;

use crate::job::JobSpec;

/// Extension used when the original name has none.
pub const FALLBACK_EXTENSION: &str = ".dat";

/// Suffix of the last component of `path` from its last `.` (inclusive),
/// or [`FALLBACK_EXTENSION`].
///
/// Both `/` and `\` separate components, so dots in directory names are
/// never picked up.
pub fn guess_extension(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rfind('.') {
        Some(i) => &file[i..],
        None => FALLBACK_EXTENSION,
    }
}

/// Slot-index to local-filename mapping for a single job.
#[derive(Debug, Clone, Default)]
pub struct SafeNames {
    job: u64,
    inputs: BTreeMap<i64, String>,
    outputs: BTreeMap<i64, String>,
}

impl SafeNames {
    pub fn new(job: u64) -> Self {
        Self {
            job,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn job(&self) -> u64 {
        self.job
    }

    /// Name for the `position`-th input, derived from its original name.
    ///
    /// An input whose slot is out of range has no original name and gets
    /// the fallback extension.
    pub fn input_name(&self, position: usize, original: Option<&str>) -> String {
        let ext = original.map(guess_extension).unwrap_or(FALLBACK_EXTENSION);
        format!("job{}_input{}{}", self.job, position, ext)
    }

    /// Record that the input for slot `index` now lives under `name`.
    pub fn record_input(&mut self, index: i64, name: String) {
        self.inputs.insert(index, name);
    }

    /// Assign a name to every in-range output slot of `spec`.
    ///
    /// Out-of-range slots are left unmapped; the output stage reports
    /// them as empty results.
    pub fn plan_outputs(&mut self, spec: &JobSpec) {
        for (position, &index) in spec.outputs().iter().enumerate() {
            if let Some(original) = spec.arg_at(index) {
                let name = format!("job{}_out{}{}", self.job, position, guess_extension(original));
                self.outputs.insert(index, name);
            }
        }
    }

    pub fn input(&self, index: i64) -> Option<&str> {
        self.inputs.get(&index).map(String::as_str)
    }

    pub fn output(&self, index: i64) -> Option<&str> {
        self.outputs.get(&index).map(String::as_str)
    }

    pub fn inputs(&self) -> impl Iterator<Item = (i64, &str)> {
        self.inputs.iter().map(|(&i, n)| (i, n.as_str()))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (i64, &str)> {
        self.outputs.iter().map(|(&i, n)| (i, n.as_str()))
    }

    /// Every mapped local filename, inputs first.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .values()
            .chain(self.outputs.values())
            .map(String::as_str)
    }
}
