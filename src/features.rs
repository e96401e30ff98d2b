//! The feature set: a bitset of optional WebAssembly proposals.
//!
//! Opcodes, types, and validation relaxations are gated on features. A
//! disabled feature is always a *validation* error, never a parse error, so
//! tooling can still inspect which features a module uses.

use std::fmt;

/// A bitset of optional proposals. The MVP instruction set is always enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Features(u32);

impl Features {
    /// The baseline: no optional proposals. Always satisfied.
    pub const MVP: Features = Features(0);

    pub const MUTABLE_GLOBALS: Features = Features(1 << 0);
    pub const SIGN_EXTENSION: Features = Features(1 << 1);
    pub const SATURATING_FLOAT_TO_INT: Features = Features(1 << 2);
    pub const MULTI_VALUE: Features = Features(1 << 3);
    pub const REFERENCE_TYPES: Features = Features(1 << 4);
    pub const BULK_MEMORY: Features = Features(1 << 5);
    pub const SIMD: Features = Features(1 << 6);
    pub const THREADS: Features = Features(1 << 7);
    pub const TAIL_CALL: Features = Features(1 << 8);
    pub const EXCEPTIONS: Features = Features(1 << 9);
    pub const MEMORY64: Features = Features(1 << 10);

    /// No optional features; MVP only.
    pub const fn none() -> Features {
        Features(0)
    }

    /// Every feature this crate knows about.
    pub const fn all() -> Features {
        Features(
            Features::MUTABLE_GLOBALS.0
                | Features::SIGN_EXTENSION.0
                | Features::SATURATING_FLOAT_TO_INT.0
                | Features::MULTI_VALUE.0
                | Features::REFERENCE_TYPES.0
                | Features::BULK_MEMORY.0
                | Features::SIMD.0
                | Features::THREADS.0
                | Features::TAIL_CALL.0
                | Features::EXCEPTIONS.0
                | Features::MEMORY64.0,
        )
    }

    /// Union of two feature sets.
    #[must_use]
    pub const fn with(self, other: Features) -> Features {
        Features(self.0 | other.0)
    }

    /// Whether every bit of `required` is enabled in `self`.
    #[must_use]
    pub const fn contains(self, required: Features) -> bool {
        self.0 & required.0 == required.0
    }

    /// Enable a feature in place.
    pub fn enable(&mut self, feature: Features) {
        self.0 |= feature.0;
    }

    /// Disable a feature in place.
    pub fn disable(&mut self, feature: Features) {
        self.0 &= !feature.0;
    }

    /// A short name for a single-bit feature set, for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Features::MVP => "mvp",
            Features::MUTABLE_GLOBALS => "mutable-globals",
            Features::SIGN_EXTENSION => "sign-extension",
            Features::SATURATING_FLOAT_TO_INT => "saturating-float-to-int",
            Features::MULTI_VALUE => "multi-value",
            Features::REFERENCE_TYPES => "reference-types",
            Features::BULK_MEMORY => "bulk-memory",
            Features::SIMD => "simd",
            Features::THREADS => "threads",
            Features::TAIL_CALL => "tail-call",
            Features::EXCEPTIONS => "exceptions",
            Features::MEMORY64 => "memory64",
            _ => "features",
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Features::none()
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "mvp");
        }
        let mut first = true;
        for bit in 0..32 {
            let single = Features(1 << bit);
            if self.contains(single) && Features::all().contains(single) {
                if !first {
                    write!(f, "+")?;
                }
                write!(f, "{}", single.name())?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mvp_is_always_contained() {
        assert!(Features::none().contains(Features::MVP));
        assert!(Features::all().contains(Features::MVP));
    }

    #[test]
    fn contains_and_with() {
        let features = Features::none()
            .with(Features::SIMD)
            .with(Features::BULK_MEMORY);
        assert!(features.contains(Features::SIMD));
        assert!(features.contains(Features::BULK_MEMORY));
        assert!(!features.contains(Features::THREADS));
        assert!(!features.contains(Features::SIMD.with(Features::THREADS)));
    }

    #[test]
    fn enable_disable() {
        let mut features = Features::none();
        features.enable(Features::TAIL_CALL);
        assert!(features.contains(Features::TAIL_CALL));
        features.disable(Features::TAIL_CALL);
        assert!(!features.contains(Features::TAIL_CALL));
    }

    #[test]
    fn display_names() {
        assert_eq!(format!("{}", Features::none()), "mvp");
        assert_eq!(format!("{}", Features::SIMD), "simd");
        let both = Features::SIMD.with(Features::THREADS);
        assert_eq!(format!("{both}"), "simd+threads");
    }
}
