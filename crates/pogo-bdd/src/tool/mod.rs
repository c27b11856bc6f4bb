//! The seam through which in-process execution reaches the tool under test.

pub mod synthetic;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

pub use synthetic::SyntheticTool;

/// Configuration handed to one in-process invocation.
///
/// Built fresh for every directive, so nothing the tool reads here leaks
/// between scenarios.
#[derive(Debug, Clone, Default)]
pub struct InvocationConfig {
    /// Effective environment overrides of the scenario.
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    /// Models directory resolved from the scenario or process environment.
    pub models_dir: Option<PathBuf>,
}

/// Captured standard streams of an in-process invocation.
#[derive(Debug, Default)]
pub struct ToolIo {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolIo {
    pub fn out(&mut self) -> &mut impl Write {
        &mut self.stdout
    }

    pub fn err(&mut self) -> &mut impl Write {
        &mut self.stderr
    }

    /// stdout followed by stderr, decoded lossily.
    pub fn combined(&self) -> String {
        let mut combined = String::from_utf8_lossy(&self.stdout).into_owned();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        combined
    }
}

/// Entry point of the tool under test, callable within the test process.
pub trait ToolEntry: Send + Sync {
    /// Runs the tool with `args` (program name already removed) and returns
    /// its exit code.
    fn run(&self, args: &[String], config: &InvocationConfig, io: &mut ToolIo) -> i32;
}

impl<F> ToolEntry for F
where
    F: Fn(&[String], &InvocationConfig, &mut ToolIo) -> i32 + Send + Sync,
{
    fn run(&self, args: &[String], config: &InvocationConfig, io: &mut ToolIo) -> i32 {
        self(args, config, io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_orders_stdout_first() {
        let mut io = ToolIo::default();
        write!(io.err(), "warning: low contrast").unwrap();
        write!(io.out(), "Hello World").unwrap();
        assert_eq!(io.combined(), "Hello World\nwarning: low contrast");
    }

    #[test]
    fn test_closure_is_a_tool() {
        let tool = |args: &[String], _: &InvocationConfig, io: &mut ToolIo| {
            let _ = writeln!(io.out(), "{}", args.join(" "));
            0
        };
        let mut io = ToolIo::default();
        let code = tool.run(&["--version".to_string()], &InvocationConfig::default(), &mut io);
        assert_eq!(code, 0);
        assert_eq!(io.combined(), "--version\n");
    }
}
