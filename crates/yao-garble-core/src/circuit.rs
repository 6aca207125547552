use serde::{Deserialize, Serialize};

/// A party to the two-party protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    /// The party garbling the circuit.
    Generator,
    /// The party evaluating the garbled circuit.
    Evaluator,
}

/// Truth table of a binary XOR gate.
pub(crate) const XOR_TABLE: [bool; 4] = [false, true, true, false];

/// Truth table of the unary identity gate.
pub(crate) const IDENTITY_TABLE: [bool; 2] = [false, true];

/// Returns `true` if `table` is the XOR truth table.
#[inline]
pub(crate) fn is_xor(table: &[bool; 4]) -> bool {
    *table == XOR_TABLE
}

/// Returns `true` if `table` is the identity truth table.
#[inline]
pub(crate) fn is_identity(table: &[bool; 2]) -> bool {
    *table == IDENTITY_TABLE
}

/// The kind of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    /// A generator-input wire.
    GeneratorInput,
    /// An evaluator-input wire.
    EvaluatorInput,
    /// A 1-input gate.
    Unary {
        /// Input wire.
        x: usize,
        /// Truth table, indexed by the input bit.
        table: [bool; 2],
    },
    /// A 2-input gate.
    Binary {
        /// First input wire.
        x: usize,
        /// Second input wire.
        y: usize,
        /// Truth table, indexed by `(y << 1) | x`.
        table: [bool; 4],
    },
}

impl GateKind {
    /// Returns `true` if the gate is free under the free-XOR technique:
    /// a binary XOR or a unary identity.
    pub fn is_free(&self) -> bool {
        match self {
            GateKind::Unary { table, .. } => is_identity(table),
            GateKind::Binary { table, .. } => is_xor(table),
            _ => false,
        }
    }
}

/// A gate in a two-party circuit.
///
/// Gates must be presented to the engines in topological order: every
/// input wire of a gate is the output wire of an earlier gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// The wire written by this gate.
    pub wire: usize,
    /// The kind of the gate.
    pub kind: GateKind,
    /// Which party, if any, learns this wire's cleartext value.
    ///
    /// Only meaningful on internal gates: input wires carry no output
    /// decoding hint.
    pub reveal: Option<Party>,
}

impl Gate {
    /// Creates a generator-input gate.
    pub fn generator_input(wire: usize) -> Self {
        Self {
            wire,
            kind: GateKind::GeneratorInput,
            reveal: None,
        }
    }

    /// Creates an evaluator-input gate.
    pub fn evaluator_input(wire: usize) -> Self {
        Self {
            wire,
            kind: GateKind::EvaluatorInput,
            reveal: None,
        }
    }

    /// Creates a 1-input gate.
    pub fn unary(wire: usize, x: usize, table: [bool; 2]) -> Self {
        Self {
            wire,
            kind: GateKind::Unary { x, table },
            reveal: None,
        }
    }

    /// Creates a 2-input gate with a truth table indexed by `(y << 1) | x`.
    pub fn binary(wire: usize, x: usize, y: usize, table: [bool; 4]) -> Self {
        Self {
            wire,
            kind: GateKind::Binary { x, y, table },
            reveal: None,
        }
    }

    /// Creates an XOR gate.
    pub fn xor(wire: usize, x: usize, y: usize) -> Self {
        Self::binary(wire, x, y, XOR_TABLE)
    }

    /// Creates an AND gate.
    pub fn and(wire: usize, x: usize, y: usize) -> Self {
        Self::binary(wire, x, y, [false, false, false, true])
    }

    /// Creates a NOT gate.
    pub fn not(wire: usize, x: usize) -> Self {
        Self::unary(wire, x, [true, false])
    }

    /// Creates an internal gate from an untyped record.
    ///
    /// External gate producers hand the engine a wire index, 1 or 2 input
    /// wires, and a truth table with one entry per input assignment; any
    /// other shape is a malformed circuit.
    pub fn internal(
        wire: usize,
        inputs: &[usize],
        table: &[bool],
        reveal: Option<Party>,
    ) -> Result<Self, CircuitError> {
        let kind = match *inputs {
            [x] => {
                let table: [bool; 2] = table
                    .try_into()
                    .map_err(|_| CircuitError::InvalidTable(table.len()))?;
                GateKind::Unary { x, table }
            }
            [x, y] => {
                let table: [bool; 4] = table
                    .try_into()
                    .map_err(|_| CircuitError::InvalidTable(table.len()))?;
                GateKind::Binary { x, y, table }
            }
            _ => return Err(CircuitError::InvalidArity(inputs.len())),
        };

        Ok(Self { wire, kind, reveal })
    }

    /// Marks this gate's output wire as revealed to `party`.
    pub fn reveal_to(mut self, party: Party) -> Self {
        self.reveal = Some(party);
        self
    }
}

/// Shape of a two-party circuit.
///
/// The engines size their wire tables and stores from this and check the
/// gate stream against it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInfo {
    /// Total number of wires.
    pub wires: usize,
    /// Number of generator-input wires.
    pub gen_inputs: usize,
    /// Number of evaluator-input wires.
    pub evl_inputs: usize,
    /// Number of wires revealed to the generator.
    pub gen_outputs: usize,
    /// Number of wires revealed to the evaluator.
    pub evl_outputs: usize,
}

/// An error that can occur when working with circuits.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    /// A gate has an unsupported number of inputs.
    #[error("invalid gate arity: {0}")]
    InvalidArity(usize),
    /// A truth table does not match the gate arity.
    #[error("invalid truth table size: {0}")]
    InvalidTable(usize),
    /// A wire index is outside the circuit's wire table.
    #[error("wire index out of range: {0}")]
    InvalidWire(usize),
}
