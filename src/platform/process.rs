//! Instrumented process-spawn primitives backed by `std::process`

use super::{deferred, Blocking, Deferred, Done};
use crate::error::Result;
use crate::intercept::catalog::{self, command_summary};
use crate::intercept::Registry;
use std::io;
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;

/// Program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

fn spawn_inherited(spec: CommandSpec) -> io::Result<Child> {
    spec.command()
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
}

fn capture(spec: CommandSpec) -> io::Result<Output> {
    spec.command().output()
}

fn shell(line: String) -> io::Result<Output> {
    #[cfg(windows)]
    let mut command = {
        let mut c = Command::new("cmd");
        c.arg("/C");
        c
    };
    #[cfg(not(windows))]
    let mut command = {
        let mut c = Command::new("sh");
        c.arg("-c");
        c
    };
    command.arg(line).output()
}

/// Process primitives installed through one registry
#[derive(Debug, Clone)]
pub struct Processes {
    spawn: Blocking<CommandSpec, Child>,
    output: Blocking<CommandSpec, Output>,
    output_callback: Deferred<CommandSpec, Output>,
    exec: Blocking<String, Output>,
    exec_callback: Deferred<String, Output>,
}

impl Processes {
    pub fn install(registry: &Registry) -> Result<Self> {
        Ok(Self {
            spawn: registry.install(catalog::SPAWN, spawn_inherited, |spec: &CommandSpec| {
                command_summary(&spec.program, &spec.args)
            })?,
            // Captured forms record the program only
            output: registry.install(catalog::OUTPUT, capture, |spec: &CommandSpec| {
                spec.program.clone()
            })?,
            output_callback: registry.install(
                catalog::OUTPUT_CALLBACK,
                deferred(capture),
                |(spec, _): &(CommandSpec, Done<Output>)| spec.program.clone(),
            )?,
            exec: registry.install(catalog::EXEC, shell, |line: &String| line.clone())?,
            exec_callback: registry.install(
                catalog::EXEC_CALLBACK,
                deferred(shell),
                |(line, _): &(String, Done<Output>)| line.clone(),
            )?,
        })
    }

    /// Start `spec` with inherited stdio
    pub fn spawn(&self, spec: CommandSpec) -> io::Result<Child> {
        self.spawn.call(spec)
    }

    /// Run `spec` to completion, capturing its output
    pub fn output(&self, spec: CommandSpec) -> io::Result<Output> {
        self.output.call(spec)
    }

    pub fn output_callback(&self, spec: CommandSpec, done: Done<Output>) -> JoinHandle<()> {
        self.output_callback.call((spec, done))
    }

    /// Run a command line through the platform shell
    pub fn exec(&self, line: impl Into<String>) -> io::Result<Output> {
        self.exec.call(line.into())
    }

    pub fn exec_callback(&self, line: impl Into<String>, done: Done<Output>) -> JoinHandle<()> {
        self.exec_callback.call((line.into(), done))
    }
}
