//! Argument vector patching.

use crate::job::JobSpec;
use crate::safe_name::SafeNames;

/// Build the argument vector handed to the engine.
///
/// Copies `spec.args()`, overwrites every mapped input and output slot
/// with its local filename, and drops element 0 (the tool token). Slots
/// without a mapping, including out-of-range output indices, are left
/// untouched.
pub fn patch_args(spec: &JobSpec, names: &SafeNames) -> Vec<String> {
    let mut safe_args = spec.args().to_vec();

    for (index, name) in names.inputs().chain(names.outputs()) {
        if let Some(slot) = spec.slot(index) {
            safe_args[slot] = name.to_string();
        }
    }

    safe_args.remove(0);
    safe_args
}
