//! One job, end to end, against a single engine instance.

use ffpipe_core::job::JobSpec;
use ffpipe_core::patch::patch_args;
use ffpipe_core::safe_name::SafeNames;
use ffpipe_engine::MediaEngine;

use crate::error::FlowError;
use crate::executor::execute;
use crate::gate::MessageGate;
use crate::sink::FrameSink;
use crate::transfer::{receive_inputs, send_outputs};

/// Run job number `job`: inputs, engine call, outputs, then delete every
/// staged file whether or not the job succeeded.
pub async fn run_job(
    engine: &mut dyn MediaEngine,
    spec: &JobSpec,
    job: u64,
    gate: &mut MessageGate,
    sink: &FrameSink,
) -> Result<(), FlowError> {
    let mut names = SafeNames::new(job);
    let result = process_job(engine, spec, &mut names, gate, sink).await;
    cleanup(engine, &names).await;
    result
}

/// Inputs, engine call, outputs, recording every staged file in `names`.
///
/// Nothing is deleted here. Callers that may drop this future part way
/// (on cancellation) keep `names` and run [`cleanup`] afterwards.
pub async fn process_job(
    engine: &mut dyn MediaEngine,
    spec: &JobSpec,
    names: &mut SafeNames,
    gate: &mut MessageGate,
    sink: &FrameSink,
) -> Result<(), FlowError> {
    receive_inputs(engine, spec, names, gate, sink).await?;

    names.plan_outputs(spec);
    let safe_args = patch_args(spec, names);

    execute(engine, spec.mode(), &safe_args, sink).await?;

    send_outputs(engine, spec, names, sink).await
}

/// Delete every file recorded in `names` from the engine.
///
/// Missing files and other failures are ignored, so running it again is
/// harmless.
pub async fn cleanup(engine: &mut dyn MediaEngine, names: &SafeNames) {
    for name in names.files() {
        if let Err(e) = engine.delete_file(name).await {
            tracing::debug!(file = %name, error = %e, "Cleanup skipped file");
        }
    }
}
