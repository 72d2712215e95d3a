// SPDX-License-Identifier: GPL-3.0-or-later

//! The conversion of a trace into the fstrace format.
//!
//! A single forward pass over the input lines: every line is parsed, the
//! complete calls are translated, and the result is written out in input
//! order. The build tool markers are recognized on the way, and they set
//! the nesting depth of the statements.

use crate::config::{self, UnknownCalls};
use crate::output::{Emitter, INIT_SYSOP_ID, Statement, Statistics};
use crate::tasks::{BuildTool, Emitted, Handler};
use crate::trace::{Call, LineParser, ParseError, Parsed};
use crate::translate::{self, Operation, Translation, TranslationError};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("line {line}: {source}")]
    Translation { line: usize, source: TranslationError },
}

pub struct Pipeline<W: Write> {
    parser: LineParser,
    handler: Handler,
    emitter: Emitter<W>,
    working_directory: String,
    unknown_calls: UnknownCalls,
    /// The unknown call names which were reported already.
    reported: HashSet<String>,
    initialized: bool,
}

impl<W: Write> Pipeline<W> {
    pub fn new(config: &config::Main, tool: BuildTool, working_directory: &str, output: W) -> Self {
        Self {
            parser: LineParser::new(&config.parser),
            handler: Handler::new(tool, config, working_directory),
            emitter: Emitter::new(output),
            working_directory: working_directory.to_string(),
            unknown_calls: config.translation.unknown_calls,
            reported: HashSet::new(),
            initialized: false,
        }
    }

    /// Converts the whole input. Returns the statistics of the run and the
    /// output, which is flushed already.
    pub fn run(mut self, mut input: impl BufRead) -> Result<(Statistics, W), PipelineError> {
        let mut buffer = Vec::new();
        let mut number = 0;
        loop {
            buffer.clear();
            if input.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            number += 1;
            let line = String::from_utf8_lossy(&buffer);
            self.process_line(line.trim_end_matches(['\n', '\r']), number)?;
        }
        self.finish()?;

        self.emitter.flush()?;
        let statistics = self.emitter.statistics().clone();
        Ok((statistics, self.emitter.into_inner()))
    }

    fn process_line(&mut self, line: &str, number: usize) -> Result<(), PipelineError> {
        self.emitter.statistics_mut().lines_read += 1;
        match self.parser.parse(line, number) {
            Ok(Parsed::Call(call)) => {
                self.emitter.statistics_mut().calls_parsed += 1;
                self.process_call(call, number)
            }
            Ok(Parsed::Pending | Parsed::Ignored) => Ok(()),
            Err(error) if error.is_fatal() => Err(error.into()),
            Err(error) => {
                log::error!("{error}");
                self.emitter.statistics_mut().lines_rejected += 1;
                Ok(())
            }
        }
    }

    fn process_call(&mut self, call: Call, number: usize) -> Result<(), PipelineError> {
        log::trace!("line {number}: {call}");
        if !self.initialized {
            self.initialize(&call)?;
        }

        match translate::translate(&call) {
            Ok(Translation::Write(written)) => {
                let emitted = self.handler.on_write(&written);
                self.emit(emitted)?;
            }
            Ok(Translation::Operations(operations)) => {
                log::trace!("line {number}: {} operation(s)", operations.len());
                let emitted = self.handler.observe(&call, &operations);
                self.sysop(&call, number, operations)?;
                self.emit(emitted)?;
            }
            Err(error) => self.translation_failed(error, number)?,
        }
        Ok(())
    }

    /// The first statement sets the working directory of the build.
    fn initialize(&mut self, call: &Call) -> Result<(), PipelineError> {
        self.initialized = true;
        let set_cwd = Operation::SetCwd { path: format!("\"{}\"", self.working_directory) };
        let statement = Statement::sysop(INIT_SYSOP_ID, &call.pid, vec![set_cwd], false);
        self.emitter.emit(self.handler.depth(), &statement)?;
        Ok(())
    }

    fn sysop(&mut self, call: &Call, number: usize, operations: Vec<Operation>) -> Result<(), PipelineError> {
        if operations.is_empty() {
            return Ok(());
        }
        let id = format!("{}_{}", call.name, number);
        let statement = Statement::sysop(id, &call.pid, operations, !call.succeeded());
        self.emitter.emit(self.handler.depth(), &statement)?;
        Ok(())
    }

    fn translation_failed(&mut self, error: TranslationError, number: usize) -> Result<(), PipelineError> {
        match error {
            TranslationError::UnknownCall { ref name } if self.unknown_calls == UnknownCalls::Skip => {
                if self.reported.insert(name.clone()) {
                    log::warn!("line {number}: {error}, calls with this name are skipped");
                }
            }
            error if error.is_fatal() => return Err(PipelineError::Translation { line: number, source: error }),
            error => log::warn!("line {number}: {error}, call skipped"),
        }
        self.emitter.statistics_mut().calls_skipped += 1;
        Ok(())
    }

    fn emit(&mut self, emitted: Vec<Emitted>) -> Result<(), PipelineError> {
        for Emitted { depth, statement } in emitted {
            self.emitter.emit(depth, &statement)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        for abandoned in self.parser.finish() {
            log::warn!(
                "line {}: {} of process {} was never resumed, dropped",
                abandoned.line,
                abandoned.name,
                abandoned.pid
            );
        }
        let emitted = self.handler.finish();
        self.emit(emitted)
    }
}
