//! Command chains
//!
//! A [`CommandLine`] is a list of steps with `&&` semantics: each step runs
//! only if the previous one succeeded, and a `cd` step moves the working
//! directory of every later step. Programs are executed from their argv, so
//! interpolated values (image names, branches, env values) are never parsed
//! by a shell. Only [`Step::Shell`] goes through `sh -c`.
//!
//! The `Display` form renders the equivalent shell line and is what ends up
//! in logs.

use std::fmt;
use std::path::PathBuf;

/// A single program argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    value: String,
    quoted: bool,
}

impl Arg {
    /// Argument rendered as-is
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }

    /// Argument rendered inside double quotes. The quotes are only cosmetic,
    /// the program receives the raw value.
    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::plain(value)
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::plain(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::plain(value.as_str())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

/// One link of a command chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Change the working directory for the following steps
    Cd(PathBuf),
    /// Run a program with arguments
    Exec { program: String, args: Vec<Arg> },
    /// Run a user supplied script with `sh -c`
    Shell(String),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Cd(dir) => write!(f, "cd {}", dir.display()),
            Step::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Step::Shell(script) => f.write_str(script),
        }
    }
}

/// A chain of steps joined with `&&`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    steps: Vec<Step>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.steps.push(Step::Cd(dir.into()));
        self
    }

    pub fn exec<I, A>(mut self, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.steps.push(Step::Exec {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn shell(mut self, script: impl Into<String>) -> Self {
        self.steps.push(Step::Shell(script.into()));
        self
    }

    /// Append every step of `other`
    pub fn then(mut self, other: CommandLine) -> Self {
        self.steps.extend(other.steps);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_chain() {
        let line = CommandLine::new()
            .cd("/repos/app")
            .exec("git", ["pull", "origin", "master"])
            .shell("npm install && npm run build");
        assert_eq!(
            line.to_string(),
            "cd /repos/app && git pull origin master && npm install && npm run build"
        );
        assert_eq!(line.steps().len(), 3);
    }

    #[test]
    fn test_quoted_arg_keeps_raw_value() {
        let arg = Arg::quoted("KEY=some value");
        assert_eq!(arg.to_string(), "\"KEY=some value\"");
        assert_eq!(arg.value(), "KEY=some value");
    }

    #[test]
    fn test_then_appends_steps() {
        let line = CommandLine::new()
            .exec("docker", ["pull", "nginx"])
            .then(CommandLine::new().exec("docker", ["run", "-d", "nginx"]));
        assert_eq!(line.to_string(), "docker pull nginx && docker run -d nginx");
    }

    #[test]
    fn test_empty_line() {
        assert!(CommandLine::new().is_empty());
        assert_eq!(CommandLine::new().to_string(), "");
    }
}
