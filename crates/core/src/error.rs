/// Errors raised while validating a job description.
#[derive(Debug, thiserror::Error)]
pub enum JobSpecError {
    #[error("Job has an empty argument vector")]
    EmptyArgs,
}

/// Errors raised while deriving a job description from a raw command line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandLineError {
    #[error("Command line is empty")]
    Empty,

    #[error("Missing input file after -i at position {0}")]
    MissingInputValue(usize),

    #[error("Missing output file after -o at position {0}")]
    MissingOutputValue(usize),

    #[error("No input files provided")]
    NoInputs,

    #[error("No output file provided")]
    NoOutput,
}
