use derive_builder::Builder;

/// Garbling configuration.
///
/// Both parties must agree on every field: the security parameter and the
/// free-XOR / row-reduction flags determine the wire format of the
/// garbled stream.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct GarbleConfig {
    /// Security parameter in bits, at most 128.
    #[builder(default = "128")]
    pub(crate) security: usize,
    /// Treat XOR gates as free.
    #[builder(default = "true")]
    pub(crate) free_xor: bool,
    /// Use garbled row reduction: 3 ciphertexts per 2-input gate, 1 per
    /// 1-input gate.
    #[builder(default = "true")]
    pub(crate) row_reduction: bool,
    /// Fold the garbled stream into the rolling digest in fixed-size
    /// chunks instead of staging the whole stream until finalization.
    #[builder(default = "true")]
    pub(crate) chunked_digest: bool,
}

impl GarbleConfig {
    /// Creates a new builder for the garbling configuration.
    pub fn builder() -> GarbleConfigBuilder {
        GarbleConfigBuilder::default()
    }

    /// Returns the security parameter in bits.
    pub fn security(&self) -> usize {
        self.security
    }

    /// Returns the key length in bytes, ⌈k/8⌉.
    pub fn key_bytes(&self) -> usize {
        (self.security + 7) / 8
    }
}

impl GarbleConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(bits) = self.security {
            if bits == 0 || bits > 128 {
                return Err(format!("security parameter out of range: {bits}"));
            }
        }
        Ok(())
    }
}

impl Default for GarbleConfig {
    fn default() -> Self {
        GarbleConfigBuilder::default().build().unwrap()
    }
}
