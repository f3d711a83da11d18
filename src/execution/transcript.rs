//! Pipeline run transcript

/// Accumulated textual log of one pipeline run.
///
/// Exclusively owned by the run building it; handed back whole to the
/// caller, on success and on failure alike.
#[derive(Debug)]
pub struct Transcript {
    buffer: String,
}

impl Transcript {
    /// Start a transcript with the pipeline header line.
    pub fn new(pipeline_name: &str) -> Self {
        Self {
            buffer: format!("Executing pipeline: {}\n", pipeline_name),
        }
    }

    /// Append the header line for a step.
    pub fn begin_step(&mut self, step_name: &str) {
        self.buffer.push_str("Step: ");
        self.buffer.push_str(step_name);
        self.buffer.push('\n');
    }

    /// Append captured command output plus the trailing separator.
    ///
    /// Appended unconditionally: failed and cancelled commands contribute
    /// whatever they flushed before dying. Invalid UTF-8 is replaced
    /// rather than dropped.
    pub fn append_output(&mut self, output: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(output));
        self.buffer.push('\n');
    }

    /// Current contents.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consume the transcript into the final string.
    pub fn into_string(self) -> String {
        self.buffer
    }
}
