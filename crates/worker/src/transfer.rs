//! Input and output file transfer between the server and the engine.

use ffpipe_core::job::JobSpec;
use ffpipe_core::messages::ClientMessage;
use ffpipe_core::safe_name::SafeNames;
use ffpipe_engine::MediaEngine;

use crate::error::FlowError;
use crate::gate::MessageGate;
use crate::reassembly::receive_exact;
use crate::sink::FrameSink;

/// Receive every input of `spec`, in order, and stage it in the engine.
///
/// Per input: a `[index, size]` declaration, `inputInfoOk`, the chunked
/// bytes, then `inputOk` once the file is written. A declaration for a
/// different index than expected aborts before anything is acknowledged.
pub async fn receive_inputs(
    engine: &mut dyn MediaEngine,
    spec: &JobSpec,
    names: &mut SafeNames,
    gate: &mut MessageGate,
    sink: &FrameSink,
) -> Result<(), FlowError> {
    for (position, &index) in spec.inputs().iter().enumerate() {
        let declaration = gate.await_input_declaration().await?;
        if declaration.index() != index {
            return Err(FlowError::IndexMismatch {
                expected: index,
                received: declaration.index(),
            });
        }
        sink.send_message(&ClientMessage::InputInfoOk)?;

        let data = receive_exact(gate, declaration.size()).await?;

        let name = names.input_name(position, spec.arg_at(index));
        // Record first so cleanup also covers a partially written file.
        names.record_input(index, name.clone());
        engine.write_file(&name, &data).await?;

        tracing::debug!(job = names.job(), index, size = data.len(), file = %name, "Input staged");
        sink.send_message(&ClientMessage::InputOk)?;
    }
    Ok(())
}

/// Send every output of `spec` back to the server.
///
/// Each mapped output gets an `outInfo` descriptor followed by one binary
/// frame with the whole file, even when the file is empty. Slots without
/// a local name (out of range) are reported as `[index, 0]` with no frame.
pub async fn send_outputs(
    engine: &mut dyn MediaEngine,
    spec: &JobSpec,
    names: &SafeNames,
    sink: &FrameSink,
) -> Result<(), FlowError> {
    for &index in spec.outputs() {
        let Some(name) = names.output(index) else {
            tracing::debug!(job = names.job(), index, "Output slot unmapped, reporting empty result");
            sink.send_message(&ClientMessage::out_info(index, 0))?;
            continue;
        };

        let data = engine.read_file(name).await?;
        tracing::debug!(job = names.job(), index, size = data.len(), file = %name, "Sending output");

        sink.send_message(&ClientMessage::out_info(index, data.len() as u64))?;
        sink.send_binary(data)?;
    }
    Ok(())
}
