//! Core components used to implement garbled circuit protocols.
//!
//! This module implements streaming garbled-circuit generation and
//! evaluation with the free-XOR technique of
//! [\[KS08\]](https://www.iacr.org/archive/icalp2008/51250483/51250483.pdf)
//! and garbled row reduction \[NPS99\], as used by cut-and-choose style
//! two-party protocols: the generator emits an unframed byte stream one
//! gate at a time, commits to its own input wires via hashed
//! decommitments, and can fold the stream into a rolling digest instead
//! of retaining it; the evaluator consumes the stream in lockstep.
//!
//! # Example
//!
//! ```
//! use rand::{Rng, SeedableRng};
//! use rand_chacha::ChaCha12Rng;
//! use yao_core::{utils::pack_bits, Block};
//! use yao_garble_core::{CircuitInfo, Evaluator, GarbleConfig, Gate, Generator, Party};
//!
//! // a ∧ b, where the generator holds a and the evaluator holds b
//! let info = CircuitInfo {
//!     wires: 3,
//!     gen_inputs: 1,
//!     evl_inputs: 1,
//!     gen_outputs: 0,
//!     evl_outputs: 1,
//! };
//! let gates = [
//!     Gate::generator_input(0),
//!     Gate::evaluator_input(1),
//!     Gate::and(2, 0, 1).reveal_to(Party::Evaluator),
//! ];
//! let config = GarbleConfig::default();
//!
//! // OT key pair for the evaluator input, delivered out of band
//! let mut rng = ChaCha12Rng::seed_from_u64(0);
//! let ot_pair: [Block; 2] = [rng.gen(), rng.gen()];
//!
//! let a = true;
//! let b = true;
//! let mask = [false];
//! let masked = pack_bits(&[a ^ mask[0]]);
//!
//! let mut gen = Generator::new(
//!     info,
//!     config.clone(),
//!     rng.gen(),
//!     vec![ot_pair],
//!     pack_bits(&mask),
//! )
//! .unwrap();
//!
//! let mut stream = Vec::new();
//! for gate in &gates {
//!     gen.next_gate(gate).unwrap();
//!     stream.extend(gen.take_output());
//! }
//!
//! let mut evl = Evaluator::new(
//!     info,
//!     config,
//!     vec![ot_pair[usize::from(b)]],
//!     masked.clone(),
//!     pack_bits(&[b]),
//!     gen.openings(&masked),
//! )
//! .unwrap();
//!
//! evl.push_bytes(&stream);
//! for gate in &gates {
//!     evl.next_gate(gate).unwrap();
//! }
//!
//! assert_eq!(evl.evaluator_outputs()[0] & 1, 1);
//! assert!(evl.verify_openings());
//! ```

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]

pub(crate) mod circuit;
mod config;
mod digest;
mod evaluator;
mod generator;
mod opening;

pub use circuit::{CircuitError, CircuitInfo, Gate, GateKind, Party};
pub use config::{GarbleConfig, GarbleConfigBuilder, GarbleConfigBuilderError};
pub use evaluator::{Evaluator, EvaluatorError};
pub use generator::{Generator, GeneratorError};
pub use opening::Decommitment;

const MB: usize = 1024 * 1024;

/// Chunk size of the staging buffer folded into the rolling digest.
pub(crate) const DIGEST_CHUNK_SIZE: usize = 10 * MB;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::Rng;
    use rand_chacha::ChaCha12Rng;
    use rand_core::SeedableRng;
    use yao_core::{
        utils::{get_bit, pack_bits},
        Block,
    };

    use super::*;

    fn config_k80() -> GarbleConfig {
        GarbleConfig::builder().security(80).build().unwrap()
    }

    fn ot_pairs(info: &CircuitInfo, k: usize) -> Vec<[Block; 2]> {
        let mut rng = ChaCha12Rng::seed_from_u64(0xbeef);
        (0..info.evl_inputs)
            .map(|_| {
                [
                    rng.gen::<Block>() & Block::low_mask(k),
                    rng.gen::<Block>() & Block::low_mask(k),
                ]
            })
            .collect()
    }

    /// Garbles and evaluates a whole circuit honestly, returning both
    /// engines and the emitted stream.
    fn run_circuit(
        gates: &[Gate],
        info: CircuitInfo,
        config: GarbleConfig,
        gen_input: &[bool],
        evl_input: &[bool],
        mask: &[bool],
        seed: Block,
    ) -> (Generator, Evaluator, Vec<u8>) {
        let pairs = ot_pairs(&info, config.security());
        let masked: Vec<bool> = gen_input.iter().zip(mask).map(|(x, m)| x ^ m).collect();
        let masked_bytes = pack_bits(&masked);

        let mut gen = Generator::new(
            info,
            config.clone(),
            seed,
            pairs.clone(),
            pack_bits(mask),
        )
        .unwrap();

        let mut stream = Vec::new();
        for gate in gates {
            gen.next_gate(gate).unwrap();
            stream.extend(gen.take_output());
        }

        let evl_keys: Vec<Block> = evl_input
            .iter()
            .zip(&pairs)
            .map(|(bit, pair)| pair[usize::from(*bit)])
            .collect();

        let mut evl = Evaluator::new(
            info,
            config,
            evl_keys,
            masked_bytes.clone(),
            pack_bits(evl_input),
            gen.openings(&masked_bytes),
        )
        .unwrap();

        evl.push_bytes(&stream);
        for gate in gates {
            evl.next_gate(gate).unwrap();
        }

        (gen, evl, stream)
    }

    fn and_circuit() -> (CircuitInfo, Vec<Gate>) {
        let info = CircuitInfo {
            wires: 3,
            gen_inputs: 1,
            evl_inputs: 1,
            gen_outputs: 0,
            evl_outputs: 1,
        };
        let gates = vec![
            Gate::evaluator_input(0),
            Gate::generator_input(1),
            Gate::and(2, 0, 1).reveal_to(Party::Evaluator),
        ];
        (info, gates)
    }

    #[test]
    fn test_and_gate_roundtrip() {
        let (info, gates) = and_circuit();

        for e in [false, true] {
            for g in [false, true] {
                for m in [false, true] {
                    let (_, evl, _) = run_circuit(
                        &gates,
                        info,
                        config_k80(),
                        &[g],
                        &[e],
                        &[m],
                        Block::new(11),
                    );
                    assert_eq!(
                        get_bit(evl.evaluator_outputs(), 0),
                        e & g,
                        "e={e} g={g} m={m}"
                    );
                    assert!(evl.verify_openings());
                }
            }
        }
    }

    #[test]
    fn test_xor_self_is_constant_zero() {
        let info = CircuitInfo {
            wires: 2,
            gen_inputs: 0,
            evl_inputs: 1,
            gen_outputs: 0,
            evl_outputs: 1,
        };
        let gates = vec![
            Gate::evaluator_input(0),
            Gate::xor(1, 0, 0).reveal_to(Party::Evaluator),
        ];

        for a in [false, true] {
            let (_, evl, stream) =
                run_circuit(&gates, info, config_k80(), &[], &[a], &[], Block::new(12));
            assert!(!get_bit(evl.evaluator_outputs(), 0));
            // one input gate plus a single hint byte; the XOR itself is free
            assert_eq!(stream.len(), 2 * 10 + 1);
        }
    }

    fn majority_circuit() -> (CircuitInfo, Vec<Gate>) {
        // MAJ(x, y, z) = ((x ^ z) & (y ^ z)) ^ z
        let info = CircuitInfo {
            wires: 7,
            gen_inputs: 1,
            evl_inputs: 2,
            gen_outputs: 0,
            evl_outputs: 1,
        };
        let gates = vec![
            Gate::evaluator_input(0),
            Gate::evaluator_input(1),
            Gate::generator_input(2),
            Gate::xor(3, 0, 2),
            Gate::xor(4, 1, 2),
            Gate::and(5, 3, 4),
            Gate::xor(6, 5, 2).reveal_to(Party::Evaluator),
        ];
        (info, gates)
    }

    #[test]
    fn test_majority_roundtrip() {
        let (info, gates) = majority_circuit();

        for pattern in 0u8..8 {
            let x = pattern & 1 != 0;
            let y = pattern & 2 != 0;
            let z = pattern & 4 != 0;
            let expected = (x & y) | (x & z) | (y & z);

            let (_, evl, _) = run_circuit(
                &gates,
                info,
                config_k80(),
                &[z],
                &[x, y],
                &[true],
                Block::new(13),
            );
            assert_eq!(get_bit(evl.evaluator_outputs(), 0), expected, "pattern={pattern}");
        }
    }

    #[test]
    fn test_majority_roundtrip_no_optimizations() {
        let (info, gates) = majority_circuit();
        let config = GarbleConfig::builder()
            .security(80)
            .free_xor(false)
            .row_reduction(false)
            .build()
            .unwrap();

        for pattern in 0u8..8 {
            let x = pattern & 1 != 0;
            let y = pattern & 2 != 0;
            let z = pattern & 4 != 0;
            let expected = (x & y) | (x & z) | (y & z);

            let (_, evl, _) = run_circuit(
                &gates,
                info,
                config.clone(),
                &[z],
                &[x, y],
                &[false],
                Block::new(14),
            );
            assert_eq!(get_bit(evl.evaluator_outputs(), 0), expected, "pattern={pattern}");
        }
    }

    #[test]
    fn test_unary_gates_roundtrip() {
        let info = CircuitInfo {
            wires: 3,
            gen_inputs: 0,
            evl_inputs: 1,
            gen_outputs: 0,
            evl_outputs: 2,
        };
        // NOT is garbled; the identity gate is free
        let gates = vec![
            Gate::evaluator_input(0),
            Gate::not(1, 0).reveal_to(Party::Evaluator),
            Gate::unary(2, 1, [false, true]).reveal_to(Party::Evaluator),
        ];

        for a in [false, true] {
            let (_, evl, _) =
                run_circuit(&gates, info, config_k80(), &[], &[a], &[], Block::new(15));
            assert_eq!(get_bit(evl.evaluator_outputs(), 0), !a);
            assert_eq!(get_bit(evl.evaluator_outputs(), 1), !a);
        }
    }

    #[test]
    fn test_generator_output_decoding() {
        let (info, mut gates) = and_circuit();
        let info = CircuitInfo {
            gen_outputs: 1,
            evl_outputs: 0,
            ..info
        };
        gates[2] = Gate::and(2, 0, 1).reveal_to(Party::Generator);

        let (_, evl, _) = run_circuit(
            &gates,
            info,
            config_k80(),
            &[true],
            &[true],
            &[true],
            Block::new(16),
        );
        assert!(get_bit(evl.generator_outputs(), 0));
        assert!(evl.evaluator_outputs().is_empty());
    }

    #[test]
    fn test_hint_flip_flips_output() {
        let (info, gates) = and_circuit();
        let (gen, evl, mut stream) = run_circuit(
            &gates,
            info,
            config_k80(),
            &[true],
            &[true],
            &[false],
            Block::new(17),
        );
        assert!(get_bit(evl.evaluator_outputs(), 0));

        // corrupt only the trailing hint byte
        *stream.last_mut().unwrap() ^= 1;

        let masked = pack_bits(&[true]);
        let pairs = ot_pairs(&info, 80);
        let mut evl = Evaluator::new(
            info,
            config_k80(),
            vec![pairs[0][1]],
            masked.clone(),
            pack_bits(&[true]),
            gen.openings(&masked),
        )
        .unwrap();

        evl.push_bytes(&stream);
        for gate in &gates {
            evl.next_gate(gate).unwrap();
        }

        assert!(!get_bit(evl.evaluator_outputs(), 0));
        // everything before the hint byte is untouched
        assert!(evl.verify_openings());
    }

    #[test]
    fn test_byte_count_law() {
        let info = CircuitInfo {
            wires: 6,
            gen_inputs: 1,
            evl_inputs: 1,
            gen_outputs: 0,
            evl_outputs: 1,
        };
        let gates = vec![
            Gate::generator_input(0),
            Gate::evaluator_input(1),
            Gate::xor(2, 0, 1),
            Gate::and(3, 0, 1),
            Gate::not(4, 3),
            Gate::and(5, 2, 4).reveal_to(Party::Evaluator),
        ];

        for row_reduction in [true, false] {
            let config = GarbleConfig::builder()
                .security(80)
                .row_reduction(row_reduction)
                .build()
                .unwrap();
            let pairs = ot_pairs(&info, 80);

            let mut gen = Generator::new(
                info,
                config.clone(),
                Block::new(18),
                pairs.clone(),
                vec![0u8],
            )
            .unwrap();

            // generator inputs must be garbled before openings exist, so
            // drive the generator one gate ahead
            let mut streams = Vec::new();
            for gate in &gates {
                gen.next_gate(gate).unwrap();
                streams.push(gen.take_output());
            }

            let masked = vec![1u8];
            let mut evl = Evaluator::new(
                info,
                config,
                vec![pairs[0][0]],
                masked.clone(),
                vec![0u8],
                gen.openings(&masked),
            )
            .unwrap();

            // the evaluator consumes exactly what the generator emitted,
            // gate by gate
            for (gate, bytes) in gates.iter().zip(&streams) {
                evl.push_bytes(bytes);
                evl.next_gate(gate).unwrap();
                assert_eq!(evl.remaining(), 0);
            }
        }
    }

    #[test]
    fn test_digest_determinism() {
        let (info, gates) = and_circuit();
        let pairs = ot_pairs(&info, 80);
        let seed = Block::new(19);

        // plain run, collecting the stream
        let mut gen = Generator::new(
            info,
            config_k80(),
            seed,
            pairs.clone(),
            vec![0u8],
        )
        .unwrap();
        let mut stream = Vec::new();
        for gate in &gates {
            gen.next_gate(gate).unwrap();
            stream.extend(gen.take_output());
        }

        // committing run: same seed, same bytes, no retained stream
        for chunked in [true, false] {
            let config = GarbleConfig::builder()
                .security(80)
                .chunked_digest(chunked)
                .build()
                .unwrap();
            let mut com_gen = Generator::new_committing(
                info,
                config.clone(),
                seed,
                pairs.clone(),
                vec![0u8],
            )
            .unwrap();
            for gate in &gates {
                com_gen.commit_next_gate(gate).unwrap();
                assert!(com_gen.output_bytes().is_empty());
            }
            let digest = com_gen.finalize_digest().unwrap();

            // the digest is the digest of the concatenated stream
            let expected: [u8; 32] = blake3::hash(&stream).into();
            assert_eq!(digest, yao_core::Hash::from(expected));

            // an honest evaluator reproduces it from the received bytes
            let masked = vec![0u8];
            let mut evl = Evaluator::new(
                info,
                config,
                vec![pairs[0][0]],
                masked.clone(),
                vec![0u8],
                gen.openings(&masked),
            )
            .unwrap();
            evl.enable_digest();
            evl.push_bytes(&stream);
            for gate in &gates {
                evl.next_gate(gate).unwrap();
            }
            assert_eq!(evl.finalize_digest().unwrap(), digest);
        }

        // same seed twice yields a byte-identical stream
        let mut gen2 = Generator::new(info, config_k80(), seed, pairs, vec![0u8]).unwrap();
        let mut stream2 = Vec::new();
        for gate in &gates {
            gen2.next_gate(gate).unwrap();
            stream2.extend(gen2.take_output());
        }
        assert_eq!(stream, stream2);
    }

    #[test]
    fn test_opening_verification() {
        let (info, gates) = and_circuit();
        let (gen, evl, stream) = run_circuit(
            &gates,
            info,
            config_k80(),
            &[true],
            &[false],
            &[true],
            Block::new(20),
        );
        assert!(evl.verify_openings());

        // a tampered opening no longer matches the streamed commitment
        let masked = pack_bits(&[false]);
        let mut openings = gen.openings(&masked);
        let mut bytes = openings[0].as_bytes().to_vec();
        bytes[0] ^= 0x80;
        openings[0] = Decommitment::from_bytes(bytes);

        let pairs = ot_pairs(&info, 80);
        let mut evl = Evaluator::new(
            info,
            config_k80(),
            vec![pairs[0][0]],
            masked,
            pack_bits(&[false]),
            openings,
        )
        .unwrap();
        evl.push_bytes(&stream);
        for gate in &gates {
            evl.next_gate(gate).unwrap();
        }
        assert!(!evl.verify_openings());
    }

    #[test]
    fn test_check_rows_reconstruct_input_parity() {
        let info = CircuitInfo {
            wires: 3,
            gen_inputs: 3,
            evl_inputs: 0,
            gen_outputs: 0,
            evl_outputs: 0,
        };
        let gates = vec![
            Gate::generator_input(0),
            Gate::generator_input(1),
            Gate::generator_input(2),
        ];

        let gen_input = [true, false, true];
        let mask = [false, true, true];
        let rows: [[bool; 3]; 5] = [
            [true, false, false],
            [false, true, false],
            [false, false, true],
            [true, true, false],
            [true, true, true],
        ];

        let (mut gen, mut evl, _) = run_circuit(
            &gates,
            info,
            config_k80(),
            &gen_input,
            &[],
            &mask,
            Block::new(21),
        );

        for (ix, row) in rows.iter().enumerate() {
            gen.garble_check_row(&pack_bits(row), ix as u64).unwrap();
        }
        evl.push_bytes(&gen.take_output());
        for (ix, row) in rows.iter().enumerate() {
            evl.evaluate_check_row(&pack_bits(row), ix as u64).unwrap();
        }
        assert_eq!(evl.remaining(), 0);

        // each recovered bit is the parity of the generator's input over
        // the row's selection
        for (ix, row) in rows.iter().enumerate() {
            let parity = row
                .iter()
                .zip(&gen_input)
                .fold(false, |acc, (r, x)| acc ^ (r & x));
            assert_eq!(get_bit(evl.check_hash(), ix), parity, "row={ix}");
        }
    }

    #[test]
    fn test_check_rows_catch_swapped_opening() {
        let info = CircuitInfo {
            wires: 2,
            gen_inputs: 2,
            evl_inputs: 0,
            gen_outputs: 0,
            evl_outputs: 0,
        };
        let gates = vec![Gate::generator_input(0), Gate::generator_input(1)];

        let gen_input = [true, false];
        let mask = [false, false];
        let masked = pack_bits(&gen_input);

        let (mut gen, _, stream) = run_circuit(
            &gates,
            info,
            config_k80(),
            &gen_input,
            &[],
            &mask,
            Block::new(22),
        );

        // swap input 1's opening for its complement blob
        let mut openings = gen.openings(&masked);
        openings[1] = gen.decommitments()[2 + 1].clone();

        let mut evl = Evaluator::new(
            info,
            config_k80(),
            vec![],
            masked,
            vec![],
            openings,
        )
        .unwrap();
        evl.push_bytes(&stream);
        for gate in &gates {
            evl.next_gate(gate).unwrap();
        }

        let rows: [[bool; 2]; 2] = [[true, false], [false, true]];
        for (ix, row) in rows.iter().enumerate() {
            gen.garble_check_row(&pack_bits(row), ix as u64).unwrap();
        }
        evl.push_bytes(&gen.take_output());
        for (ix, row) in rows.iter().enumerate() {
            evl.evaluate_check_row(&pack_bits(row), ix as u64).unwrap();
        }

        // row 0 does not select the swapped input, row 1 does
        assert_eq!(get_bit(evl.check_hash(), 0), gen_input[0]);
        assert_eq!(get_bit(evl.check_hash(), 1), !gen_input[1]);

        // and the swapped opening fails the commitment check
        assert!(!evl.verify_openings());
    }
}
