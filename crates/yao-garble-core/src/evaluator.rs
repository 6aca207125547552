use core::fmt;

use yao_core::{
    aes::{FixedKeyAes, FIXED_KEY_AES},
    utils, Block, Hash,
};

use crate::{
    circuit::{is_identity, is_xor, CircuitError, CircuitInfo, Gate, GateKind, Party},
    config::GarbleConfig,
    digest::StreamDigest,
    opening::Decommitment,
};

/// Errors that can occur during garbled circuit evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    /// The circuit is malformed.
    #[error(transparent)]
    CircuitError(#[from] CircuitError),
    /// The garbled stream ended before the gate's ciphertexts.
    #[error("garbled stream too short: {needed} bytes required, {available} available")]
    BufferUnderrun {
        /// Bytes the gate needed.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// The OT key vector does not match the declared evaluator-input
    /// count.
    #[error("invalid OT key count: expected {0}, got {1}")]
    InvalidOtKeyCount(usize, usize),
    /// The opening vector does not match the declared generator-input
    /// count.
    #[error("invalid opening count: expected {0}, got {1}")]
    InvalidOpeningCount(usize, usize),
    /// An input bit vector does not cover its declared input count.
    #[error("{0} input too short: {1} bits required")]
    InvalidInput(&'static str, usize),
    /// More gates of a kind were presented than the circuit declares.
    #[error("gate exceeds declared {0} count")]
    CountExceeded(&'static str),
    /// A check row does not cover every generator input.
    #[error("check row too short: {0} bits required")]
    InvalidCheckRow(usize),
    /// A check row index is outside the security parameter.
    #[error("check row index out of range: {0}")]
    InvalidCheckRowIndex(u64),
}

/// Garbled circuit evaluator.
///
/// Consumes the generator's byte stream gate by gate, in the same
/// topological order, reconstructing the active key on every wire. The
/// caller refills the input buffer with received bytes between gates.
pub struct Evaluator {
    info: CircuitInfo,
    config: GarbleConfig,
    cipher: &'static FixedKeyAes,
    /// Mask clearing everything above the key width.
    clear_mask: Block,
    /// Active keys, indexed by wire id.
    wires: Vec<Block>,
    /// One OT key per evaluator input, selected by the input bit.
    ot_keys: Vec<Block>,
    /// The generator's masked input bits.
    masked_input: Vec<u8>,
    /// The evaluator's input bits.
    input: Vec<u8>,
    /// One opened decommitment per generator input.
    openings: Vec<Decommitment>,
    /// Commitments captured from the stream, one per generator input.
    commitments: Vec<Vec<u8>>,
    /// Input buffer and read cursor.
    buffer: Vec<u8>,
    pos: usize,
    /// Output bits revealed to the evaluator, packed.
    evl_out: Vec<u8>,
    /// Output bits revealed to the generator, packed.
    gen_out: Vec<u8>,
    /// Reconstructed generator-input hash, one bit per check row.
    check_hash: Vec<u8>,
    digest: Option<StreamDigest>,
    /// Tweak for the gate KDF; advances in lockstep with the generator.
    gate_ix: u64,
    gen_inp_ix: usize,
    evl_inp_ix: usize,
    gen_out_ix: usize,
    evl_out_ix: usize,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evaluator {{ .. }}")
    }
}

impl Evaluator {
    /// Creates a new evaluator.
    ///
    /// # Arguments
    ///
    /// * `info` - Shape of the circuit to evaluate.
    /// * `config` - Garbling configuration; must match the generator's.
    /// * `ot_keys` - One key per evaluator input, obtained via oblivious
    ///   transfer for the corresponding input bit.
    /// * `masked_input` - The generator's masked input bits.
    /// * `input` - The evaluator's input bits.
    /// * `openings` - One opened decommitment per generator input,
    ///   received through the opening path.
    pub fn new(
        info: CircuitInfo,
        config: GarbleConfig,
        ot_keys: Vec<Block>,
        masked_input: Vec<u8>,
        input: Vec<u8>,
        openings: Vec<Decommitment>,
    ) -> Result<Self, EvaluatorError> {
        if ot_keys.len() != info.evl_inputs {
            return Err(EvaluatorError::InvalidOtKeyCount(
                info.evl_inputs,
                ot_keys.len(),
            ));
        }
        if openings.len() != info.gen_inputs {
            return Err(EvaluatorError::InvalidOpeningCount(
                info.gen_inputs,
                openings.len(),
            ));
        }
        if masked_input.len() * 8 < info.gen_inputs {
            return Err(EvaluatorError::InvalidInput("generator", info.gen_inputs));
        }
        if input.len() * 8 < info.evl_inputs {
            return Err(EvaluatorError::InvalidInput("evaluator", info.evl_inputs));
        }

        Ok(Self {
            cipher: &FIXED_KEY_AES,
            clear_mask: Block::low_mask(config.security),
            wires: vec![Block::ZERO; info.wires],
            commitments: Vec::with_capacity(info.gen_inputs),
            buffer: Vec::new(),
            pos: 0,
            evl_out: vec![0u8; (info.evl_outputs + 7) / 8],
            gen_out: vec![0u8; (info.gen_outputs + 7) / 8],
            check_hash: vec![0u8; config.key_bytes()],
            digest: None,
            gate_ix: 0,
            gen_inp_ix: 0,
            evl_inp_ix: 0,
            gen_out_ix: 0,
            evl_out_ix: 0,
            info,
            config,
            ot_keys,
            masked_input,
            input,
            openings,
        })
    }

    /// Appends received garbled-stream bytes to the input buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the number of buffered bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Enables the rolling digest over consumed stream bytes.
    ///
    /// An honest run then reproduces the committing generator's digest.
    pub fn enable_digest(&mut self) {
        self.digest = Some(StreamDigest::new(self.config.chunked_digest));
    }

    /// Finalizes and returns the rolling digest, if enabled.
    pub fn finalize_digest(&mut self) -> Option<Hash> {
        self.digest.take().map(StreamDigest::finalize)
    }

    /// Evaluates the next gate, consuming its bytes from the input
    /// buffer.
    pub fn next_gate(&mut self, gate: &Gate) -> Result<(), EvaluatorError> {
        if gate.wire >= self.info.wires {
            return Err(CircuitError::InvalidWire(gate.wire).into());
        }

        let start = self.pos;
        let kb = self.config.key_bytes();

        let key = match gate.kind {
            GateKind::GeneratorInput => {
                if self.gen_inp_ix >= self.info.gen_inputs {
                    return Err(EvaluatorError::CountExceeded("generator input"));
                }

                let bit = usize::from(utils::get_bit(&self.masked_input, self.gen_inp_ix));
                let key = self.openings[self.gen_inp_ix].key(kb);

                let coms = self.read_bytes(2 * kb)?;
                let com = coms[bit * kb..(bit + 1) * kb].to_vec();
                self.commitments.push(com);

                self.gen_inp_ix += 1;
                key
            }
            GateKind::EvaluatorInput => {
                if self.evl_inp_ix >= self.info.evl_inputs {
                    return Err(EvaluatorError::CountExceeded("evaluator input"));
                }

                let bit = usize::from(utils::get_bit(&self.input, self.evl_inp_ix));
                let ot_key = self.ot_keys[self.evl_inp_ix];

                let blocks = self.read_bytes(2 * kb)?;
                let masked = Block::from_lo_bytes(&blocks[bit * kb..(bit + 1) * kb]);

                self.evl_inp_ix += 1;
                ot_key ^ masked
            }
            GateKind::Unary { x, table } => {
                if x >= self.info.wires {
                    return Err(CircuitError::InvalidWire(x).into());
                }
                let key = if self.config.free_xor && is_identity(&table) {
                    self.wires[x]
                } else {
                    self.unary_gate(x)?
                };
                if let Some(party) = gate.reveal {
                    self.decode_output(party, key)?;
                }
                key
            }
            GateKind::Binary { x, y, table } => {
                if x >= self.info.wires {
                    return Err(CircuitError::InvalidWire(x).into());
                }
                if y >= self.info.wires {
                    return Err(CircuitError::InvalidWire(y).into());
                }
                let key = if self.config.free_xor && is_xor(&table) {
                    self.wires[x] ^ self.wires[y]
                } else {
                    self.binary_gate(x, y)?
                };
                if let Some(party) = gate.reveal {
                    self.decode_output(party, key)?;
                }
                key
            }
        };

        self.wires[gate.wire] = key;
        self.gate_ix += 1;

        if let Some(digest) = self.digest.as_mut() {
            digest.absorb(&self.buffer[start..self.pos]);
        }

        Ok(())
    }

    /// Evaluates one row of the generator-input consistency check,
    /// setting bit `row_ix` of the reconstructed input hash.
    pub fn evaluate_check_row(&mut self, row: &[u8], row_ix: u64) -> Result<(), EvaluatorError> {
        if row.len() * 8 < self.info.gen_inputs {
            return Err(EvaluatorError::InvalidCheckRow(self.info.gen_inputs));
        }
        if row_ix >= self.config.security as u64 {
            return Err(EvaluatorError::InvalidCheckRowIndex(row_ix));
        }

        let kb = self.config.key_bytes();
        let tweak = Block::from(row_ix);

        let mut msg = vec![0u8; 2 * kb];
        for j in 0..self.info.gen_inputs {
            if utils::get_bit(row, j) {
                utils::xor_inplace(&mut msg, self.openings[j].as_bytes());
            }
        }

        let bit = usize::from(utils::get_bit(&msg, 0));
        let key = Block::from_lo_bytes(&msg[..kb]);
        let hash = self.cipher.tccr(tweak, key) & self.clear_mask;

        let cts = self.read_bytes(2 * kb)?;
        let ct = Block::from_lo_bytes(&cts[bit * kb..(bit + 1) * kb]);

        let out_key = hash ^ ct;
        utils::set_bit(&mut self.check_hash, row_ix as usize, out_key.lsb() == 1);

        Ok(())
    }

    /// Returns `true` iff every opening matches the commitment captured
    /// from the garbled stream.
    ///
    /// A mismatch is a protocol-level signal for the outer layer, not an
    /// error.
    pub fn verify_openings(&self) -> bool {
        self.commitments.len() == self.openings.len()
            && self
                .openings
                .iter()
                .zip(&self.commitments)
                .all(|(opening, com)| opening.commit() == *com)
    }

    /// Returns the commitments captured from the garbled stream.
    pub fn commitments(&self) -> &[Vec<u8>] {
        &self.commitments
    }

    /// Returns the reconstructed generator-input hash, one bit per check
    /// row, packed.
    pub fn check_hash(&self) -> &[u8] {
        &self.check_hash
    }

    /// Returns the output bits revealed to the evaluator, packed.
    pub fn evaluator_outputs(&self) -> &[u8] {
        &self.evl_out
    }

    /// Returns the output bits revealed to the generator, packed.
    pub fn generator_outputs(&self) -> &[u8] {
        &self.gen_out
    }

    /// Consumes `n` bytes from the input buffer.
    fn read_bytes(&mut self, n: usize) -> Result<&[u8], EvaluatorError> {
        let available = self.buffer.len() - self.pos;
        if n > available {
            return Err(EvaluatorError::BufferUnderrun {
                needed: n,
                available,
            });
        }
        let bytes = &self.buffer[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Consumes the hint byte of an output wire and stores the decoded
    /// bit.
    fn decode_output(&mut self, party: Party, key: Block) -> Result<(), EvaluatorError> {
        let hint = self.read_bytes(1)?[0];
        let bit = (key.lsb() as u8 ^ hint) & 1 != 0;

        match party {
            Party::Evaluator => {
                if self.evl_out_ix >= self.info.evl_outputs {
                    return Err(EvaluatorError::CountExceeded("evaluator output"));
                }
                utils::set_bit(&mut self.evl_out, self.evl_out_ix, bit);
                self.evl_out_ix += 1;
            }
            Party::Generator => {
                if self.gen_out_ix >= self.info.gen_outputs {
                    return Err(EvaluatorError::CountExceeded("generator output"));
                }
                utils::set_bit(&mut self.gen_out, self.gen_out_ix, bit);
                self.gen_out_ix += 1;
            }
        }

        Ok(())
    }

    fn unary_gate(&mut self, x: usize) -> Result<Block, EvaluatorError> {
        let tweak = Block::from(self.gate_ix);
        let kb = self.config.key_bytes();

        let x_key = self.wires[x];
        let px = x_key.lsb();
        let hash = self.cipher.tccr(tweak, x_key) & self.clear_mask;

        let key = if self.config.row_reduction {
            let row = self.read_bytes(kb)?;
            if px == 0 {
                hash
            } else {
                hash ^ Block::from_lo_bytes(row)
            }
        } else {
            let rows = self.read_bytes(2 * kb)?;
            hash ^ Block::from_lo_bytes(&rows[px * kb..(px + 1) * kb])
        };

        Ok(key)
    }

    fn binary_gate(&mut self, x: usize, y: usize) -> Result<Block, EvaluatorError> {
        let tweak = Block::from(self.gate_ix);
        let kb = self.config.key_bytes();

        let x_key = self.wires[x];
        let y_key = self.wires[y];
        let ix = (y_key.lsb() << 1) | x_key.lsb();
        let hash = self.cipher.tccr2(tweak, x_key, y_key) & self.clear_mask;

        let key = if self.config.row_reduction {
            let rows = self.read_bytes(3 * kb)?;
            if ix == 0 {
                hash
            } else {
                hash ^ Block::from_lo_bytes(&rows[(ix - 1) * kb..ix * kb])
            }
        } else {
            let rows = self.read_bytes(4 * kb)?;
            hash ^ Block::from_lo_bytes(&rows[ix * kb..(ix + 1) * kb])
        };

        Ok(key)
    }
}
