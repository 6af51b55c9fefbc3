//! Builder configuration

use trellis_core::IdentityStrategy;

/// Tree builder configuration
#[derive(Clone, Debug, Default)]
pub struct BuilderConfig {
    /// How node identities are derived
    pub identity: IdentityStrategy,
    /// Modifier in effect outside any loop
    pub root_modifier: u64,
}

impl BuilderConfig {
    /// Positional identities, for builds where call sites are not stable
    /// (declarations generated at runtime, for example)
    pub fn sequential() -> Self {
        BuilderConfig {
            identity: IdentityStrategy::Sequential,
            root_modifier: 0,
        }
    }

    pub fn with_identity(mut self, identity: IdentityStrategy) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_root_modifier(mut self, modifier: u64) -> Self {
        self.root_modifier = modifier;
        self
    }
}
