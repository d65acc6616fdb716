//! Derive a [`JobSpec`] from a raw tool command line.
//!
//! Used on the dispatching side: a wrapper invoked as `ffmpeg ...` or
//! `ffprobe ...` hands its argument vector over, and the slot indices
//! of the input and output files are worked out here.
//!
//! Rules:
//! - every argument following `-i` is an input;
//! - the argument following `-o` is the output, if present;
//! - otherwise the output is the last argument that is not a flag and
//!   was not consumed by `-i`.

use crate::error::CommandLineError;
use crate::job::{JobSpec, ToolMode};

impl JobSpec {
    /// Split `args` (tool token first) into a job description.
    ///
    /// Inspect jobs may have no output; transform jobs must have one.
    pub fn from_command_line(args: Vec<String>) -> Result<JobSpec, CommandLineError> {
        let tool = args.first().ok_or(CommandLineError::Empty)?;
        let mode = ToolMode::from_tool(tool);

        let mut inputs = Vec::new();
        let mut explicit_output = None;
        let mut last_positional = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-i" => {
                    if i + 1 >= args.len() {
                        return Err(CommandLineError::MissingInputValue(i));
                    }
                    inputs.push((i + 1) as i64);
                    i += 2;
                    continue;
                }
                "-o" => {
                    if i + 1 >= args.len() {
                        return Err(CommandLineError::MissingOutputValue(i));
                    }
                    explicit_output = Some((i + 1) as i64);
                    i += 2;
                    continue;
                }
                flag if flag.starts_with('-') => {}
                _ => last_positional = Some(i as i64),
            }
            i += 1;
        }

        if inputs.is_empty() {
            return Err(CommandLineError::NoInputs);
        }

        let outputs: Vec<i64> = explicit_output.or(last_positional).into_iter().collect();
        if outputs.is_empty() && mode == ToolMode::Transform {
            return Err(CommandLineError::NoOutput);
        }

        JobSpec::new(args, inputs, outputs).map_err(|_| CommandLineError::Empty)
    }
}
