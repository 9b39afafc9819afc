//! Interned names.
//!
//! Names compared at shading time (coordinate spaces, standard attributes) are
//! reduced to a [`Symbol`], a 64-bit FNV-1a hash computed in `const` context.
//! Comparisons are plain integer equality.
//!
//! The process-wide [`SymbolTable`] maps the fixed vocabulary back to names
//! for diagnostics. It is built once, on first use, and checked for hash
//! collisions at that point.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::stable_hash::fnv1a64_str;

/// Interned name identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub u64);

impl Symbol {
    #[inline]
    pub const fn new(name: &str) -> Self {
        Self(fnv1a64_str(name))
    }

    /// Split into `(low, high)` 32-bit halves for instruction operands.
    #[inline]
    pub const fn to_words(self) -> (u32, u32) {
        (self.0 as u32, (self.0 >> 32) as u32)
    }

    #[inline]
    pub const fn from_words(low: u32, high: u32) -> Self {
        Self((low as u64) | ((high as u64) << 32))
    }

    /// Name of this symbol if it belongs to the standard vocabulary.
    pub fn name(self) -> Option<&'static str> {
        symbol_table().name(self)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "#{:016x}", self.0),
        }
    }
}

/// Compile-time symbol from a string literal.
///
/// ```
/// use umbra_foundation::{symbol, Symbol};
/// const WORLD: Symbol = symbol!("world");
/// assert_eq!(WORLD, Symbol::new("world"));
/// ```
#[macro_export]
macro_rules! symbol {
    ($name:literal) => {{
        $crate::symbols::Symbol::new($name)
    }};
}

/// Standard names known to the VM.
pub mod std_symbols {
    use super::Symbol;

    pub const OBJECT: Symbol = Symbol::new("object");
    pub const WORLD: Symbol = Symbol::new("world");
    pub const CAMERA: Symbol = Symbol::new("camera");
    pub const SCREEN: Symbol = Symbol::new("screen");
    pub const RASTER: Symbol = Symbol::new("raster");
    pub const NDC: Symbol = Symbol::new("NDC");

    pub const GENERATED: Symbol = Symbol::new("generated");
    pub const UV: Symbol = Symbol::new("uv");
    pub const TANGENT: Symbol = Symbol::new("tangent");
    pub const VERTEX_COLOR: Symbol = Symbol::new("color");
    pub const POINTINESS: Symbol = Symbol::new("pointiness");
    pub const RANDOM_PER_ISLAND: Symbol = Symbol::new("random_per_island");
    pub const OBJECT_LOCATION: Symbol = Symbol::new("object:location");
    pub const OBJECT_INDEX: Symbol = Symbol::new("object:index");
    pub const OBJECT_RANDOM: Symbol = Symbol::new("object:random");
    pub const MATERIAL_INDEX: Symbol = Symbol::new("material:index");
    pub const PARTICLE_AGE: Symbol = Symbol::new("particle:age");
    pub const VOLUME_DENSITY: Symbol = Symbol::new("density");
    pub const VOLUME_COLOR: Symbol = Symbol::new("volume:color");
    pub const VOLUME_TEMPERATURE: Symbol = Symbol::new("temperature");

    /// Every standard name, in table order.
    pub const VOCABULARY: &[&str] = &[
        "object",
        "world",
        "camera",
        "screen",
        "raster",
        "NDC",
        "generated",
        "uv",
        "tangent",
        "color",
        "pointiness",
        "random_per_island",
        "object:location",
        "object:index",
        "object:random",
        "material:index",
        "particle:age",
        "density",
        "volume:color",
        "temperature",
    ];
}

/// Two names hashing to the same symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("symbol collision: '{existing}' and '{incoming}' both hash to {:016x}", .symbol.0)]
pub struct SymbolCollision {
    pub existing: &'static str,
    pub incoming: &'static str,
    pub symbol: Symbol,
}

/// Immutable symbol-to-name table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: IndexMap<Symbol, &'static str>,
}

impl SymbolTable {
    /// Build a table, failing on the first hash collision between distinct names.
    ///
    /// Repeating the same name is not a collision.
    pub fn build(names: &[&'static str]) -> Result<Self, SymbolCollision> {
        let mut table = IndexMap::with_capacity(names.len());
        for &name in names {
            let symbol = Symbol::new(name);
            match table.get(&symbol) {
                Some(&existing) if existing != name => {
                    return Err(SymbolCollision {
                        existing,
                        incoming: name,
                        symbol,
                    });
                }
                Some(_) => {}
                None => {
                    table.insert(symbol, name);
                }
            }
        }
        Ok(Self { names: table })
    }

    pub fn name(&self, symbol: Symbol) -> Option<&'static str> {
        self.names.get(&symbol).copied()
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.names.contains_key(&symbol)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &'static str)> + '_ {
        self.names.iter().map(|(s, n)| (*s, *n))
    }
}

/// The process-wide table of standard names.
///
/// A collision in the standard vocabulary is logged and leaves the table
/// empty, so that name lookups degrade to hex display instead of lying.
pub fn symbol_table() -> &'static SymbolTable {
    static TABLE: OnceLock<SymbolTable> = OnceLock::new();
    TABLE.get_or_init(|| match SymbolTable::build(std_symbols::VOCABULARY) {
        Ok(table) => {
            tracing::debug!(symbols = table.len(), "built standard symbol table");
            table
        }
        Err(collision) => {
            tracing::error!(%collision, "standard symbol vocabulary has a hash collision");
            SymbolTable::default()
        }
    })
}
