//! Build Description - Makefile Sink
//!
//! Accumulates targets in emission order. Every target must go through
//! `create_target -> start_deps -> add_dep* -> end_deps -> start_cmds ->
//! (add_cmd | add_nam_cmd)* -> end_cmds`; anything else is rejected and
//! leaves the sink untouched.

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Between targets
    Idle,
    TargetCreated,
    InDeps,
    DepsClosed,
    InCmds,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SinkState::Idle => "idle",
            SinkState::TargetCreated => "target created",
            SinkState::InDeps => "inside dependency list",
            SinkState::DepsClosed => "dependency list closed",
            SinkState::InCmds => "inside command list",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MakefileError {
    #[error("{op} is not allowed while {state}")]
    OutOfOrder { op: &'static str, state: SinkState },

    #[error("Target {0} was left open")]
    Unterminated(String),

    #[error("{0:?} cannot be written as a make target or prerequisite")]
    UnrepresentableName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Command {
    /// Progress label, only shown when not verbose
    Named(String),
    /// Shell command line
    Shell(String),
}

impl Command {
    pub fn text(&self) -> &str {
        match self {
            Command::Named(s) | Command::Shell(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub deps: Vec<String>,
    pub cmds: Vec<Command>,
}

/// Position to roll back to if a fragment has to be discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone, Serialize)]
pub struct Makefile {
    targets: Vec<Target>,
    #[serde(skip)]
    state: SinkState,
    #[serde(skip)]
    verbose: bool,
}

impl Makefile {
    pub fn new(verbose: bool) -> Self {
        Self {
            targets: vec![],
            state: SinkState::Idle,
            verbose,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SinkState::Idle
    }

    fn require(&self, op: &'static str, state: SinkState) -> Result<(), MakefileError> {
        if self.state == state {
            Ok(())
        } else {
            Err(MakefileError::OutOfOrder { op, state: self.state })
        }
    }

    fn current(&mut self) -> &mut Target {
        // Every state other than Idle implies an open target.
        let idx = self.targets.len() - 1;
        &mut self.targets[idx]
    }

    pub fn create_target(&mut self, name: &str) -> Result<(), MakefileError> {
        self.require("create_target", SinkState::Idle)?;
        check_name(name)?;
        self.targets.push(Target {
            name: name.to_string(),
            deps: vec![],
            cmds: vec![],
        });
        self.state = SinkState::TargetCreated;
        Ok(())
    }

    pub fn start_deps(&mut self) -> Result<(), MakefileError> {
        self.require("start_deps", SinkState::TargetCreated)?;
        self.state = SinkState::InDeps;
        Ok(())
    }

    pub fn add_dep(&mut self, name: &str) -> Result<(), MakefileError> {
        self.require("add_dep", SinkState::InDeps)?;
        check_name(name)?;
        self.current().deps.push(name.to_string());
        Ok(())
    }

    pub fn end_deps(&mut self) -> Result<(), MakefileError> {
        self.require("end_deps", SinkState::InDeps)?;
        self.state = SinkState::DepsClosed;
        Ok(())
    }

    pub fn start_cmds(&mut self) -> Result<(), MakefileError> {
        self.require("start_cmds", SinkState::DepsClosed)?;
        self.state = SinkState::InCmds;
        Ok(())
    }

    /// Add a progress label such as `echo -e "CONVERT\t..."`
    pub fn add_nam_cmd(&mut self, cmd: fmt::Arguments<'_>) -> Result<(), MakefileError> {
        self.require("add_nam_cmd", SinkState::InCmds)?;
        self.current().cmds.push(Command::Named(cmd.to_string()));
        Ok(())
    }

    pub fn add_cmd(&mut self, cmd: fmt::Arguments<'_>) -> Result<(), MakefileError> {
        self.require("add_cmd", SinkState::InCmds)?;
        self.current().cmds.push(Command::Shell(cmd.to_string()));
        Ok(())
    }

    pub fn end_cmds(&mut self) -> Result<(), MakefileError> {
        self.require("end_cmds", SinkState::InCmds)?;
        self.state = SinkState::Idle;
        Ok(())
    }

    /// Only valid between targets
    pub fn checkpoint(&self) -> Result<Checkpoint, MakefileError> {
        self.require("checkpoint", SinkState::Idle)?;
        Ok(Checkpoint(self.targets.len()))
    }

    /// Drop every target emitted after `checkpoint`, including an open one
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.targets.truncate(checkpoint.0);
        self.state = SinkState::Idle;
    }

    /// Targets emitted since `checkpoint`
    pub fn since(&self, checkpoint: Checkpoint) -> &[Target] {
        &self.targets[checkpoint.0.min(self.targets.len())..]
    }

    /// Fails if a target is still open
    pub fn finish(&self) -> Result<(), MakefileError> {
        match self.targets.last() {
            Some(t) if !self.is_idle() => Err(MakefileError::Unterminated(t.name.clone())),
            _ => Ok(()),
        }
    }

    pub fn write_to<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            write!(out, "{}:", escape_name(&target.name))?;
            for dep in &target.deps {
                write!(out, " {}", escape_name(dep))?;
            }
            writeln!(out)?;
            let prefix = if self.verbose { "" } else { "@" };
            for cmd in &target.cmds {
                if self.verbose && matches!(cmd, Command::Named(_)) {
                    continue;
                }
                writeln!(out, "\t{}{}", prefix, escape_cmd(cmd.text()))?;
            }
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for Makefile {
    fn default() -> Self {
        Self::new(false)
    }
}

/// make has no escape for line breaks inside a name
fn check_name(name: &str) -> Result<(), MakefileError> {
    if name.contains(['\n', '\r']) {
        Err(MakefileError::UnrepresentableName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Escape a target or prerequisite name for make
pub fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '$' => out.push_str("$$"),
            ' ' | ':' | '#' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape a recipe line for make; the shell sees the text verbatim
pub fn escape_cmd(cmd: &str) -> String {
    cmd.replace('$', "$$")
}
