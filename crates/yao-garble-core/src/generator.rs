use core::fmt;

use rand_core::SeedableRng;
use yao_core::{
    aes::{FixedKeyAes, FIXED_KEY_AES},
    utils, Block, Hash, Prg,
};

use crate::{
    circuit::{is_identity, is_xor, CircuitError, CircuitInfo, Gate, GateKind},
    config::GarbleConfig,
    digest::StreamDigest,
    opening::Decommitment,
};

/// Errors that can occur during garbled circuit generation.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The circuit is malformed.
    #[error(transparent)]
    CircuitError(#[from] CircuitError),
    /// The OT key vector does not match the declared evaluator-input
    /// count.
    #[error("invalid OT key count: expected {0}, got {1}")]
    InvalidOtKeyCount(usize, usize),
    /// The input mask does not cover every generator input.
    #[error("input mask too short: {0} bits required")]
    InvalidInputMask(usize),
    /// More gates of a kind were presented than the circuit declares.
    #[error("gate exceeds declared {0} count")]
    CountExceeded(&'static str),
    /// A check row does not cover every generator input.
    #[error("check row too short: {0} bits required")]
    InvalidCheckRow(usize),
    /// A check row was requested before all generator inputs were
    /// garbled.
    #[error("not all generator inputs have been garbled")]
    MissingDecommitments,
    /// The committing path was used without a digest.
    #[error("stream digest is not enabled")]
    DigestDisabled,
}

/// Garbled circuit generator.
///
/// Garbles one circuit gate by gate, in topological order, appending the
/// gate ciphertexts to an output buffer the caller drains between gates.
/// All wire labels are derived from the seed; the "one" label on any wire
/// is the "zero" label XOR the global offset R.
pub struct Generator {
    info: CircuitInfo,
    config: GarbleConfig,
    cipher: &'static FixedKeyAes,
    prg: Prg,
    /// Global offset R. Its low bit is 1 so a label's low bit encodes the
    /// wire's cleartext bit under point-and-permute.
    delta: Block,
    /// Mask clearing everything above the key width.
    clear_mask: Block,
    /// Zero-labels, indexed by wire id.
    wires: Vec<Block>,
    /// One OT key pair per evaluator input.
    ot_keys: Vec<[Block; 2]>,
    /// The generator's input mask, packed bits.
    input_mask: Vec<u8>,
    /// Decommitment pairs, two per generator input.
    decom: Vec<Decommitment>,
    /// Output buffer drained by the caller between gates.
    output: Vec<u8>,
    digest: Option<StreamDigest>,
    /// Tweak for the gate KDF; unique across the whole circuit.
    gate_ix: u64,
    gen_inp_ix: usize,
    evl_inp_ix: usize,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generator {{ .. }}")
    }
}

impl Generator {
    /// Creates a new generator.
    ///
    /// # Arguments
    ///
    /// * `info` - Shape of the circuit to garble.
    /// * `config` - Garbling configuration; must match the evaluator's.
    /// * `seed` - PRG seed all wire labels are derived from.
    /// * `ot_keys` - One key pair per evaluator input, delivered to the
    ///   evaluator out of band via oblivious transfer.
    /// * `input_mask` - The generator's input mask, packed bits.
    pub fn new(
        info: CircuitInfo,
        config: GarbleConfig,
        seed: Block,
        ot_keys: Vec<[Block; 2]>,
        input_mask: Vec<u8>,
    ) -> Result<Self, GeneratorError> {
        if ot_keys.len() != info.evl_inputs {
            return Err(GeneratorError::InvalidOtKeyCount(
                info.evl_inputs,
                ot_keys.len(),
            ));
        }
        if input_mask.len() * 8 < info.gen_inputs {
            return Err(GeneratorError::InvalidInputMask(info.gen_inputs));
        }

        let mut prg = Prg::from_seed(seed);

        // R: low k bits random, low bit forced to 1
        let mut delta = Block::from_lo_bytes(&prg.random_bits(config.security));
        delta.set_lsb();

        Ok(Self {
            cipher: &FIXED_KEY_AES,
            clear_mask: Block::low_mask(config.security),
            wires: vec![Block::ZERO; info.wires],
            decom: Vec::with_capacity(2 * info.gen_inputs),
            output: Vec::new(),
            digest: None,
            gate_ix: 0,
            gen_inp_ix: 0,
            evl_inp_ix: 0,
            info,
            config,
            prg,
            delta,
            ot_keys,
            input_mask,
        })
    }

    /// Creates a generator that folds the garbled stream into a rolling
    /// digest, clearing the output buffer after every gate.
    ///
    /// The generator then never retains the full garbled circuit; only
    /// its digest is kept for the outer commitment.
    pub fn new_committing(
        info: CircuitInfo,
        config: GarbleConfig,
        seed: Block,
        ot_keys: Vec<[Block; 2]>,
        input_mask: Vec<u8>,
    ) -> Result<Self, GeneratorError> {
        let mut gen = Self::new(info, config, seed, ot_keys, input_mask)?;
        gen.digest = Some(StreamDigest::new(gen.config.chunked_digest));
        Ok(gen)
    }

    /// Garbles the next gate, appending its ciphertexts to the output
    /// buffer.
    pub fn next_gate(&mut self, gate: &Gate) -> Result<(), GeneratorError> {
        if gate.wire >= self.info.wires {
            return Err(CircuitError::InvalidWire(gate.wire).into());
        }

        let zero = match gate.kind {
            GateKind::GeneratorInput => self.generator_input()?,
            GateKind::EvaluatorInput => self.evaluator_input()?,
            GateKind::Unary { x, table } => {
                if x >= self.info.wires {
                    return Err(CircuitError::InvalidWire(x).into());
                }
                let zero = if self.config.free_xor && is_identity(&table) {
                    self.wires[x]
                } else {
                    self.unary_gate(x, table)
                };
                if gate.reveal.is_some() {
                    self.output.push(zero.lsb() as u8);
                }
                zero
            }
            GateKind::Binary { x, y, table } => {
                if x >= self.info.wires {
                    return Err(CircuitError::InvalidWire(x).into());
                }
                if y >= self.info.wires {
                    return Err(CircuitError::InvalidWire(y).into());
                }
                let zero = if self.config.free_xor && is_xor(&table) {
                    self.wires[x] ^ self.wires[y]
                } else {
                    self.binary_gate(x, y, table)
                };
                if gate.reveal.is_some() {
                    self.output.push(zero.lsb() as u8);
                }
                zero
            }
        };

        self.wires[gate.wire] = zero;
        self.gate_ix += 1;

        Ok(())
    }

    /// Garbles the next gate and folds the emitted bytes into the rolling
    /// digest, flushing the output buffer.
    pub fn commit_next_gate(&mut self, gate: &Gate) -> Result<(), GeneratorError> {
        if self.digest.is_none() {
            return Err(GeneratorError::DigestDisabled);
        }

        self.next_gate(gate)?;

        if let Some(digest) = self.digest.as_mut() {
            digest.absorb(&self.output);
        }
        self.output.clear();

        Ok(())
    }

    /// Garbles one row of the generator-input consistency check.
    ///
    /// XORs the masked decommitments selected by `row` into a single
    /// message and emits two ciphertexts hiding a fresh label pair; the
    /// evaluator recovers one label and collects its low bit into the
    /// reconstructed input hash. `row_ix` is the KDF tweak and must match
    /// on both sides.
    pub fn garble_check_row(&mut self, row: &[u8], row_ix: u64) -> Result<(), GeneratorError> {
        if self.gen_inp_ix != self.info.gen_inputs {
            return Err(GeneratorError::MissingDecommitments);
        }
        if row.len() * 8 < self.info.gen_inputs {
            return Err(GeneratorError::InvalidCheckRow(self.info.gen_inputs));
        }

        let kb = self.config.key_bytes();
        let tweak = Block::from(row_ix);

        let mut z0 = Block::from_lo_bytes(&self.prg.random_bits(self.config.security));
        z0.clear_lsb();
        let z = [z0, z0 ^ self.delta];

        let mut msg = vec![0u8; 2 * kb];
        for j in 0..self.info.gen_inputs {
            if utils::get_bit(row, j) {
                let bit = usize::from(utils::get_bit(&self.input_mask, j));
                utils::xor_inplace(&mut msg, self.decom[2 * j + bit].as_bytes());
            }
        }

        let key = Block::from_lo_bytes(&msg[..kb]);
        let keys = [key, key ^ self.delta];

        let cts = [
            (self.cipher.tccr(tweak, keys[0]) & self.clear_mask) ^ z[0],
            (self.cipher.tccr(tweak, keys[1]) & self.clear_mask) ^ z[1],
        ];

        let bit = usize::from(utils::get_bit(&msg, 0));
        self.emit_key(cts[bit]);
        self.emit_key(cts[1 - bit]);

        Ok(())
    }

    /// Returns the bytes emitted since the output buffer was last
    /// drained.
    pub fn output_bytes(&self) -> &[u8] {
        &self.output
    }

    /// Drains the output buffer.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Returns the global offset R.
    pub fn delta(&self) -> Block {
        self.delta
    }

    /// Returns the decommitment pairs, two per generator input.
    pub fn decommitments(&self) -> &[Decommitment] {
        &self.decom
    }

    /// Returns the openings to send for the given masked input: for each
    /// generator input `j`, the decommitment at position `2j + m_j`.
    ///
    /// These are the blobs whose hashes the evaluator captured from the
    /// garbled stream.
    pub fn openings(&self, masked_input: &[u8]) -> Vec<Decommitment> {
        (0..self.gen_inp_ix)
            .map(|j| {
                let bit = usize::from(utils::get_bit(masked_input, j));
                self.decom[2 * j + bit].clone()
            })
            .collect()
    }

    /// Finalizes and returns the rolling digest, if enabled.
    pub fn finalize_digest(&mut self) -> Option<Hash> {
        self.digest.take().map(StreamDigest::finalize)
    }

    /// Draws a fresh zero-label: low k bits random, the rest clear.
    fn fresh_key(&mut self) -> Block {
        Block::from_lo_bytes(&self.prg.random_bits(self.config.security))
    }

    /// Appends the low ⌈k/8⌉ bytes of `key` to the output buffer.
    fn emit_key(&mut self, key: Block) {
        let kb = self.config.key_bytes();
        self.output.extend_from_slice(&key.to_bytes()[..kb]);
    }

    fn generator_input(&mut self) -> Result<Block, GeneratorError> {
        if self.gen_inp_ix >= self.info.gen_inputs {
            return Err(GeneratorError::CountExceeded("generator input"));
        }

        let kb = self.config.key_bytes();
        let zero = self.fresh_key();
        let keys = [zero, zero ^ self.delta];
        let bit = usize::from(utils::get_bit(&self.input_mask, self.gen_inp_ix));

        let padding = self.prg.random_bits(self.config.security);
        let d0 = Decommitment::new(keys[bit], &padding, kb);
        let padding = self.prg.random_bits(self.config.security);
        let d1 = Decommitment::new(keys[1 - bit], &padding, kb);

        self.output.extend_from_slice(&d0.commit());
        self.output.extend_from_slice(&d1.commit());

        self.decom.push(d0);
        self.decom.push(d1);
        self.gen_inp_ix += 1;

        Ok(zero)
    }

    fn evaluator_input(&mut self) -> Result<Block, GeneratorError> {
        if self.evl_inp_ix >= self.info.evl_inputs {
            return Err(GeneratorError::CountExceeded("evaluator input"));
        }

        let zero = self.fresh_key();
        let [k0, k1] = self.ot_keys[self.evl_inp_ix];

        self.emit_key(k0 ^ zero);
        self.emit_key(k1 ^ zero ^ self.delta);

        self.evl_inp_ix += 1;

        Ok(zero)
    }

    fn unary_gate(&mut self, x: usize, table: [bool; 2]) -> Block {
        let tweak = Block::from(self.gate_ix);
        let x0 = self.wires[x];
        let px = x0.lsb();

        // Row 0 key: X_px; row 1 toggles delta back in.
        let mut key = if px == 1 { x0 ^ self.delta } else { x0 };

        let hash = self.cipher.tccr(tweak, key) & self.clear_mask;
        let bit = usize::from(table[px]);

        let mut z = [Block::ZERO; 2];
        if self.config.row_reduction {
            // row 0 ciphertext is implicit: its plaintext becomes the
            // output label
            z[bit] = hash;
            z[1 - bit] = hash ^ self.delta;
        } else {
            z[0] = self.fresh_key();
            z[1] = z[0] ^ self.delta;
            self.emit_key(hash ^ z[bit]);
        }

        // row 1: X_{1-px}
        key ^= self.delta;
        let hash = self.cipher.tccr(tweak, key) & self.clear_mask;
        self.emit_key(hash ^ z[usize::from(table[px ^ 1])]);

        z[0]
    }

    fn binary_gate(&mut self, x: usize, y: usize, table: [bool; 4]) -> Block {
        let tweak = Block::from(self.gate_ix);
        let x0 = self.wires[x];
        let y0 = self.wires[y];
        let px = x0.lsb();
        let py = y0.lsb();
        let ix = (py << 1) | px;

        // Row 0 keys: (X_px, Y_py); the remaining rows are walked in
        // permuted order by toggling delta on the key pair.
        let mut key_x = if px == 1 { x0 ^ self.delta } else { x0 };
        let mut key_y = if py == 1 { y0 ^ self.delta } else { y0 };

        let hash = self.cipher.tccr2(tweak, key_x, key_y) & self.clear_mask;
        let bit = usize::from(table[ix]);

        let mut z = [Block::ZERO; 2];
        if self.config.row_reduction {
            z[bit] = hash;
            z[1 - bit] = hash ^ self.delta;
        } else {
            z[0] = self.fresh_key();
            z[1] = z[0] ^ self.delta;
            self.emit_key(hash ^ z[bit]);
        }

        // row 1: (X_{1-px}, Y_py)
        key_x ^= self.delta;
        let hash = self.cipher.tccr2(tweak, key_x, key_y) & self.clear_mask;
        self.emit_key(hash ^ z[usize::from(table[ix ^ 1])]);

        // row 2: (X_px, Y_{1-py})
        key_x ^= self.delta;
        key_y ^= self.delta;
        let hash = self.cipher.tccr2(tweak, key_x, key_y) & self.clear_mask;
        self.emit_key(hash ^ z[usize::from(table[ix ^ 2])]);

        // row 3: (X_{1-px}, Y_{1-py})
        key_x ^= self.delta;
        let hash = self.cipher.tccr2(tweak, key_x, key_y) & self.clear_mask;
        self.emit_key(hash ^ z[usize::from(table[ix ^ 3])]);

        z[0]
    }
}
