//! Step domain model

use crate::core::config::StepConfig;

/// A single step in a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Human-readable step name
    pub name: String,

    /// Raw command lines, in execution order
    pub commands: Vec<String>,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &StepConfig) -> Self {
        Step {
            name: config.name.clone(),
            commands: config.commands.clone(),
        }
    }
}

/// A command line tokenized into an executable and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable name, the first whitespace token
    pub program: String,

    /// Remaining tokens
    pub args: Vec<String>,
}

impl CommandLine {
    /// Tokenize a raw command string on whitespace.
    ///
    /// Returns `None` when the string contains no tokens at all; load-time
    /// validation rejects such commands, but pipelines built literally can
    /// still carry them.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut tokens = raw.split_whitespace();
        let program = tokens.next()?.to_string();
        let args = tokens.map(str::to_string).collect();
        Some(CommandLine { program, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_and_args() {
        let cmd = CommandLine::parse("cmd1 arg1 arg2").unwrap();
        assert_eq!(cmd.program, "cmd1");
        assert_eq!(cmd.args, vec!["arg1", "arg2"]);
    }

    #[test]
    fn test_parse_program_only() {
        let cmd = CommandLine::parse("make").unwrap();
        assert_eq!(cmd.program, "make");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let cmd = CommandLine::parse("  go   test\t./...  ").unwrap();
        assert_eq!(cmd.program, "go");
        assert_eq!(cmd.args, vec!["test", "./..."]);
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(CommandLine::parse("").is_none());
        assert!(CommandLine::parse("   \t  ").is_none());
    }
}
