//! Job description sent by the dispatch server.
//!
//! A [`JobSpec`] is the full tool command line plus the positions of the
//! arguments that name input and output files. The tool mode (inspect vs
//! transform) is resolved once, when the spec is constructed, from the
//! suffix of the first argument.

use serde::{Deserialize, Serialize};

use crate::error::JobSpecError;

/// Suffix of the first argument that selects [`ToolMode::Inspect`].
pub const INSPECT_TOOL_SUFFIX: &str = "ffprobe";

/// Which engine entry point a job runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// Stream/container inspection (`ffprobe`).
    Inspect,
    /// Transcoding and everything else (`ffmpeg`).
    Transform,
}

impl ToolMode {
    /// Pick the mode from the tool token in `args[0]`.
    pub fn from_tool(tool: &str) -> Self {
        if tool.ends_with(INSPECT_TOOL_SUFFIX) {
            ToolMode::Inspect
        } else {
            ToolMode::Transform
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolMode::Inspect => "inspect",
            ToolMode::Transform => "transform",
        }
    }
}

/// Wire shape of a job: `{"args": [...], "inputs": [...], "outputs": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawJobSpec {
    args: Vec<String>,
    #[serde(default)]
    inputs: Vec<i64>,
    #[serde(default)]
    outputs: Vec<i64>,
}

/// One unit of work: an argument vector plus input/output slot indices.
///
/// Indices are signed so that a misbehaving server's negative indices
/// still parse and are handled as out-of-range slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawJobSpec", into = "RawJobSpec")]
pub struct JobSpec {
    args: Vec<String>,
    inputs: Vec<i64>,
    outputs: Vec<i64>,
    mode: ToolMode,
}

impl JobSpec {
    pub fn new(args: Vec<String>, inputs: Vec<i64>, outputs: Vec<i64>) -> Result<Self, JobSpecError> {
        let tool = args.first().ok_or(JobSpecError::EmptyArgs)?;
        let mode = ToolMode::from_tool(tool);
        Ok(Self {
            args,
            inputs,
            outputs,
            mode,
        })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn inputs(&self) -> &[i64] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[i64] {
        &self.outputs
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// The tool token (`args[0]`); never part of the engine call.
    pub fn tool(&self) -> &str {
        &self.args[0]
    }

    /// Resolve a signed slot index to a position in `args`, if in range.
    pub fn slot(&self, index: i64) -> Option<usize> {
        usize::try_from(index).ok().filter(|&i| i < self.args.len())
    }

    /// The original argument at a slot index, if in range.
    pub fn arg_at(&self, index: i64) -> Option<&str> {
        self.slot(index).map(|i| self.args[i].as_str())
    }
}

impl TryFrom<RawJobSpec> for JobSpec {
    type Error = JobSpecError;

    fn try_from(raw: RawJobSpec) -> Result<Self, Self::Error> {
        JobSpec::new(raw.args, raw.inputs, raw.outputs)
    }
}

impl From<JobSpec> for RawJobSpec {
    fn from(spec: JobSpec) -> Self {
        RawJobSpec {
            args: spec.args,
            inputs: spec.inputs,
            outputs: spec.outputs,
        }
    }
}
