//! Compiled shader programs: instruction words, entry points, verification
//! and the on-disk encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::encoding::{Instruction, UNCONNECTED};
use crate::error::ProgramError;
use crate::features::FeatureMask;
use crate::opcode::{OpcodeKind, NO_ENTRY};

/// Which graph of a material is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderKind {
    Surface,
    Volume,
    Displacement,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [
        ShaderKind::Surface,
        ShaderKind::Volume,
        ShaderKind::Displacement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Surface => "surface",
            ShaderKind::Volume => "volume",
            ShaderKind::Displacement => "displacement",
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Word offset where evaluation starts, per shader kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryPoints {
    pub surface: Option<u32>,
    pub volume: Option<u32>,
    pub displacement: Option<u32>,
}

impl EntryPoints {
    pub fn get(&self, kind: ShaderKind) -> Option<u32> {
        match kind {
            ShaderKind::Surface => self.surface,
            ShaderKind::Volume => self.volume,
            ShaderKind::Displacement => self.displacement,
        }
    }

    pub fn set(&mut self, kind: ShaderKind, offset: u32) {
        let slot = match kind {
            ShaderKind::Surface => &mut self.surface,
            ShaderKind::Volume => &mut self.volume,
            ShaderKind::Displacement => &mut self.displacement,
        };
        *slot = Some(offset);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShaderKind, u32)> + '_ {
        ShaderKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|offset| (kind, offset)))
    }
}

/// An immutable compiled shader, shared by every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    words: Vec<Instruction>,
    entries: EntryPoints,
    /// Registers the program addresses (highest offset + width).
    stack_size: u32,
}

/// Magic bytes of an encoded program.
pub const MAGIC: [u8; 4] = *b"UMBR";
pub const VERSION: u32 = 1;

const HEADER_BYTES: usize = 4 + 4 + 4 + 3 * 4 + 4;
const WORD_BYTES: usize = 16;

impl Program {
    pub fn new(words: Vec<Instruction>, entries: EntryPoints, stack_size: u32) -> Self {
        Self {
            words,
            entries,
            stack_size,
        }
    }

    pub fn words(&self) -> &[Instruction] {
        &self.words
    }

    pub fn entries(&self) -> &EntryPoints {
        &self.entries
    }

    pub fn stack_size(&self) -> u32 {
        self.stack_size
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Walk the stream and return `(offset, opcode)` for every instruction.
    ///
    /// # Errors
    ///
    /// Fails on an unknown opcode or an instruction whose width runs past the
    /// end of the stream.
    pub fn instructions(&self) -> Result<Vec<(usize, OpcodeKind)>, ProgramError> {
        let mut found = Vec::new();
        let mut offset = 0;
        while offset < self.words.len() {
            let word = &self.words[offset];
            let kind = OpcodeKind::from_u32(word.opcode).ok_or(ProgramError::UnknownOpcode {
                opcode: word.opcode,
                offset,
            })?;
            let width = kind.metadata().width_of(word);
            if width == 0 || offset + width > self.words.len() {
                return Err(ProgramError::TruncatedInstruction {
                    opcode: kind.name(),
                    offset,
                    width,
                    len: self.words.len(),
                });
            }
            found.push((offset, kind));
            offset += width;
        }
        Ok(found)
    }

    /// Union of the feature categories this program uses.
    pub fn required_features(&self) -> Result<FeatureMask, ProgramError> {
        Ok(self
            .instructions()?
            .into_iter()
            .fold(FeatureMask::CORE, |mask, (_, kind)| mask | kind.metadata().feature))
    }

    /// Static checks that let the executor trust the stream.
    ///
    /// Checks instruction boundaries and widths, entry points, jump and
    /// entry-selection targets, register demand against `stack_capacity`, and
    /// that every gated opcode is enabled in `features`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProgramError`] found.
    #[instrument(skip(self), fields(words = self.words.len()))]
    pub fn verify(&self, features: FeatureMask, stack_capacity: u32) -> Result<(), ProgramError> {
        if self.stack_size > stack_capacity {
            return Err(ProgramError::RegisterOutOfRange {
                required: self.stack_size,
                capacity: stack_capacity,
            });
        }

        let instructions = self.instructions()?;
        let mut boundary = vec![false; self.words.len()];
        for (offset, _) in &instructions {
            boundary[*offset] = true;
        }
        let is_boundary = |target: usize| boundary.get(target).copied().unwrap_or(false);

        for (kind, offset) in self.entries.iter() {
            if !is_boundary(offset as usize) {
                return Err(ProgramError::EntryOutOfRange { kind, offset });
            }
        }

        for (offset, kind) in &instructions {
            let (offset, kind) = (*offset, *kind);
            let word = &self.words[offset];
            let feature = kind.metadata().feature;
            if !features.contains(feature) {
                return Err(ProgramError::FeatureNotEnabled {
                    opcode: kind.name(),
                    offset,
                    feature: feature.name(),
                });
            }
            match kind {
                OpcodeKind::JumpIfZero | OpcodeKind::JumpIfOne => {
                    let target = offset + 1 + word.b as usize;
                    if !is_boundary(target) {
                        return Err(ProgramError::JumpOutOfRange { offset, target });
                    }
                }
                OpcodeKind::SelectEntry => {
                    for (field, kind) in [word.a, word.b, word.c].into_iter().zip(ShaderKind::ALL) {
                        if field != NO_ENTRY && !is_boundary(field as usize) {
                            return Err(ProgramError::EntryOutOfRange { kind, offset: field });
                        }
                    }
                }
                _ => {}
            }
        }

        debug!(
            instructions = instructions.len(),
            stack_size = self.stack_size,
            "verified program"
        );
        Ok(())
    }

    // === Encoding ===

    /// Serialize to the versioned little-endian byte format.
    ///
    /// Layout: magic, version, stack size, surface / volume / displacement
    /// entries ([`NO_ENTRY`] when absent), word count, then four `u32` per
    /// word.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_BYTES + self.words.len() * WORD_BYTES);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.stack_size.to_le_bytes());
        for kind in ShaderKind::ALL {
            let entry = self.entries.get(kind).unwrap_or(NO_ENTRY);
            out.extend_from_slice(&entry.to_le_bytes());
        }
        out.extend_from_slice(&(self.words.len() as u32).to_le_bytes());
        for word in &self.words {
            for field in word.to_fields() {
                out.extend_from_slice(&field.to_le_bytes());
            }
        }
        out
    }

    /// Parse and structurally verify an encoded program.
    ///
    /// Feature gating is not checked here; that depends on the executor the
    /// program will run on.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError`] for a malformed header, a short buffer, or a
    /// stream that fails [`verify`](Self::verify).
    pub fn decode(bytes: &[u8]) -> Result<Self, ProgramError> {
        if bytes.len() < HEADER_BYTES {
            return Err(ProgramError::Truncated {
                expected: HEADER_BYTES,
                found: bytes.len(),
            });
        }
        if bytes[..4] != MAGIC {
            return Err(ProgramError::BadMagic);
        }

        let mut fields = bytes[4..].chunks_exact(4).map(|chunk| {
            u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        });
        let mut next = || fields.next().unwrap_or(0);

        let version = next();
        if version != VERSION {
            return Err(ProgramError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }
        let stack_size = next();
        let mut entries = EntryPoints::default();
        for kind in ShaderKind::ALL {
            let entry = next();
            if entry != NO_ENTRY {
                entries.set(kind, entry);
            }
        }
        let count = next() as usize;

        let expected = count
            .checked_mul(WORD_BYTES)
            .and_then(|n| n.checked_add(HEADER_BYTES))
            .unwrap_or(usize::MAX);
        if bytes.len() < expected {
            return Err(ProgramError::Truncated {
                expected,
                found: bytes.len(),
            });
        }

        let words = (0..count)
            .map(|_| Instruction::from_fields([next(), next(), next(), next()]))
            .collect();

        let program = Self::new(words, entries, stack_size);
        program.verify(FeatureMask::ALL, UNCONNECTED)?;
        Ok(program)
    }
}
