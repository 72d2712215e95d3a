// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Operation, Translate, TranslationError};
use crate::trace::{Call, UNRESOLVED_POINTER_PREFIX};

/// Suppresses the translation when any of the path arguments is a raw
/// address, which means the tracer could not read the string.
pub struct CheckPaths {
    indices: &'static [usize],
    inner: Box<dyn Translate>,
}

pub fn check_paths(indices: &'static [usize], inner: impl Translate + 'static) -> CheckPaths {
    CheckPaths { indices, inner: Box::new(inner) }
}

impl Translate for CheckPaths {
    fn translate(&self, call: &Call) -> Result<Vec<Operation>, TranslationError> {
        let unresolved = self
            .indices
            .iter()
            .filter_map(|index| call.arg(*index))
            .any(|arg| arg.starts_with(UNRESOLVED_POINTER_PREFIX));
        if unresolved { Ok(vec![]) } else { self.inner.translate(call) }
    }
}

/// The condition on the return value which suppresses the translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The call failed.
    Negative,
    /// The call failed, or the tracer could not tell the result.
    NegativeOrUnresolved,
}

impl Gate {
    fn blocks(&self, call: &Call) -> bool {
        match self {
            Gate::Negative => call.ret.is_negative(),
            Gate::NegativeOrUnresolved => call.ret.is_negative() || call.ret.is_unresolved(),
        }
    }
}

/// Translates only the calls which pass the gate.
pub struct Gated {
    gate: Gate,
    inner: Box<dyn Translate>,
}

pub fn gated(gate: Gate, inner: impl Translate + 'static) -> Gated {
    Gated { gate, inner: Box::new(inner) }
}

impl Translate for Gated {
    fn translate(&self, call: &Call) -> Result<Vec<Operation>, TranslationError> {
        if self.gate.blocks(call) { Ok(vec![]) } else { self.inner.translate(call) }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::ReturnValue;
    use crate::translate::{AccessMode, Resolution};

    fn fixture(call: &Call) -> Result<Vec<Operation>, TranslationError> {
        Ok(vec![Operation::touch("AT_FDCWD", &call.args[0], AccessMode::Consumed, Resolution::Follow)])
    }

    fn call(args: &[&str], ret: ReturnValue) -> Call {
        Call::new("1", "mock", args.iter().map(|arg| arg.to_string()).collect(), ret)
    }

    #[test]
    fn test_check_paths_passes_strings() {
        let sut = check_paths(&[0, 1], fixture);

        let result = sut.translate(&call(&["\"a\"", "\"b\""], ReturnValue::Value(0)));

        assert_eq!(result.map(|ops| ops.len()), Ok(1));
    }

    #[test]
    fn test_check_paths_suppresses_addresses() {
        let sut = check_paths(&[1], fixture);

        let result = sut.translate(&call(&["\"a\"", "0x7ffc2d0e1a60"], ReturnValue::Value(0)));

        assert_eq!(result, Ok(vec![]));
    }

    #[test]
    fn test_check_paths_ignores_unchecked_positions() {
        let sut = check_paths(&[0], fixture);

        let result = sut.translate(&call(&["\"a\"", "0x7ffc2d0e1a60"], ReturnValue::Value(0)));

        assert_eq!(result.map(|ops| ops.len()), Ok(1));
    }

    #[test]
    fn test_gate_negative() {
        let sut = gated(Gate::Negative, fixture);

        assert_eq!(sut.translate(&call(&["\"a\""], ReturnValue::Value(-1))), Ok(vec![]));
        assert_eq!(sut.translate(&call(&["\"a\""], ReturnValue::Value(0))).map(|ops| ops.len()), Ok(1));
        assert_eq!(sut.translate(&call(&["\"a\""], ReturnValue::Unresolved)).map(|ops| ops.len()), Ok(1));
    }

    #[test]
    fn test_gate_negative_or_unresolved() {
        let sut = gated(Gate::NegativeOrUnresolved, fixture);

        assert_eq!(sut.translate(&call(&["\"a\""], ReturnValue::Value(-1))), Ok(vec![]));
        assert_eq!(sut.translate(&call(&["\"a\""], ReturnValue::Unresolved)), Ok(vec![]));
        assert_eq!(sut.translate(&call(&["\"a\""], ReturnValue::Value(42))).map(|ops| ops.len()), Ok(1));
    }

    #[test]
    fn test_gate_runs_before_inner_errors() {
        let failing = |call: &Call| -> Result<Vec<Operation>, TranslationError> {
            Err(TranslationError::MissingArgument { name: call.name.clone(), index: 3 })
        };
        let sut = gated(Gate::Negative, failing);

        assert_eq!(sut.translate(&call(&[], ReturnValue::Value(-2))), Ok(vec![]));
    }
}
