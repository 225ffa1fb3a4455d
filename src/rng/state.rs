use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::{ChaCha20Rng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

use super::Xoshiro256;
use crate::error::ReplayError;

/// Version written into every exported [`GeneratorState`].
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorFamily {
    ChaCha8,
    ChaCha20,
    Xoshiro256,
}

/// Raw state words of one generator family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum StateWords {
    ChaCha8 {
        seed: [u8; 32],
        stream: u64,
        word_pos: u128,
    },
    ChaCha20 {
        seed: [u8; 32],
        stream: u64,
        word_pos: u128,
    },
    Xoshiro256 {
        s: [u64; 4],
    },
}

/// Everything needed to resume a pseudo-random sequence.
///
/// Two generators holding equal states produce identical future draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorState {
    pub version: u32,
    pub words: StateWords,
}

impl GeneratorState {
    pub fn new(words: StateWords) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            words,
        }
    }

    pub fn family(&self) -> GeneratorFamily {
        match self.words {
            StateWords::ChaCha8 { .. } => GeneratorFamily::ChaCha8,
            StateWords::ChaCha20 { .. } => GeneratorFamily::ChaCha20,
            StateWords::Xoshiro256 { .. } => GeneratorFamily::Xoshiro256,
        }
    }

    pub fn check_version(&self) -> Result<(), ReplayError> {
        if self.version == STATE_FORMAT_VERSION {
            Ok(())
        } else {
            Err(ReplayError::UnsupportedVersion(self.version))
        }
    }
}

/// Generators that can hand out a copy of their internal state.
///
/// Returning `None` marks the generator as unsupported for replay.
pub trait ExportState {
    fn export_state(&self) -> Option<GeneratorState>;
}

/// Generators that can be overwritten with a previously exported state.
pub trait ImportState {
    fn import_state(&mut self, state: &GeneratorState) -> Result<(), ReplayError>;
}

/// A host's authoritative generator.
pub trait LiveRng: RngCore + ExportState {
    fn as_rng_core(&mut self) -> &mut dyn RngCore;
}

impl<T: RngCore + ExportState> LiveRng for T {
    fn as_rng_core(&mut self) -> &mut dyn RngCore {
        self
    }
}

macro_rules! chacha_state {
    ($rng:ty, $variant:ident) => {
        impl ExportState for $rng {
            fn export_state(&self) -> Option<GeneratorState> {
                Some(GeneratorState::new(StateWords::$variant {
                    seed: self.get_seed(),
                    stream: self.get_stream(),
                    word_pos: self.get_word_pos(),
                }))
            }
        }

        impl ImportState for $rng {
            fn import_state(&mut self, state: &GeneratorState) -> Result<(), ReplayError> {
                state.check_version()?;
                match &state.words {
                    StateWords::$variant {
                        seed,
                        stream,
                        word_pos,
                    } => {
                        let mut rng = <$rng>::from_seed(*seed);
                        rng.set_stream(*stream);
                        rng.set_word_pos(*word_pos);
                        *self = rng;
                        Ok(())
                    }
                    _ => Err(ReplayError::FamilyMismatch {
                        expected: GeneratorFamily::$variant,
                        found: state.family(),
                    }),
                }
            }
        }
    };
}

chacha_state!(ChaCha8Rng, ChaCha8);
chacha_state!(ChaCha20Rng, ChaCha20);

impl ExportState for Xoshiro256 {
    fn export_state(&self) -> Option<GeneratorState> {
        Some(GeneratorState::new(StateWords::Xoshiro256 { s: self.words() }))
    }
}

impl ImportState for Xoshiro256 {
    fn import_state(&mut self, state: &GeneratorState) -> Result<(), ReplayError> {
        state.check_version()?;
        match &state.words {
            StateWords::Xoshiro256 { s } => {
                self.set_words(*s);
                Ok(())
            }
            _ => Err(ReplayError::FamilyMismatch {
                expected: GeneratorFamily::Xoshiro256,
                found: state.family(),
            }),
        }
    }
}

// StdRng keeps its algorithm private, so it can never be replayed.
impl ExportState for StdRng {
    fn export_state(&self) -> Option<GeneratorState> {
        None
    }
}

/// Private generator owned by a [`super::ReplayableRng`], of the same family as its source.
#[derive(Debug, Clone)]
pub enum ForkedRng {
    ChaCha8(ChaCha8Rng),
    ChaCha20(ChaCha20Rng),
    Xoshiro256(Xoshiro256),
}

impl ForkedRng {
    /// A generator of the given family with an arbitrary (zero-seeded) state.
    pub fn blank(family: GeneratorFamily) -> Self {
        match family {
            GeneratorFamily::ChaCha8 => ForkedRng::ChaCha8(ChaCha8Rng::seed_from_u64(0)),
            GeneratorFamily::ChaCha20 => ForkedRng::ChaCha20(ChaCha20Rng::seed_from_u64(0)),
            GeneratorFamily::Xoshiro256 => ForkedRng::Xoshiro256(Xoshiro256::seed_from_u64(0)),
        }
    }

    pub fn from_state(state: &GeneratorState) -> Result<Self, ReplayError> {
        let mut rng = Self::blank(state.family());
        rng.import_state(state)?;
        Ok(rng)
    }

    pub fn family(&self) -> GeneratorFamily {
        match self {
            ForkedRng::ChaCha8(_) => GeneratorFamily::ChaCha8,
            ForkedRng::ChaCha20(_) => GeneratorFamily::ChaCha20,
            ForkedRng::Xoshiro256(_) => GeneratorFamily::Xoshiro256,
        }
    }

    fn inner(&mut self) -> &mut dyn RngCore {
        match self {
            ForkedRng::ChaCha8(rng) => rng,
            ForkedRng::ChaCha20(rng) => rng,
            ForkedRng::Xoshiro256(rng) => rng,
        }
    }
}

impl ExportState for ForkedRng {
    fn export_state(&self) -> Option<GeneratorState> {
        match self {
            ForkedRng::ChaCha8(rng) => rng.export_state(),
            ForkedRng::ChaCha20(rng) => rng.export_state(),
            ForkedRng::Xoshiro256(rng) => rng.export_state(),
        }
    }
}

impl ImportState for ForkedRng {
    fn import_state(&mut self, state: &GeneratorState) -> Result<(), ReplayError> {
        match self {
            ForkedRng::ChaCha8(rng) => rng.import_state(state),
            ForkedRng::ChaCha20(rng) => rng.import_state(state),
            ForkedRng::Xoshiro256(rng) => rng.import_state(state),
        }
    }
}

impl RngCore for ForkedRng {
    fn next_u32(&mut self) -> u32 {
        self.inner().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner().fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner().try_fill_bytes(dest)
    }
}
