/// Maximum number of parents a single resource may depend on.
pub const MAX_PARENTS: usize = 4;

/// Maximum length of a parent chain, counting the resource itself.
///
/// Claim propagation walks the chain with a fixed-size stack of this many
/// frames, so the builder rejects graphs that would not fit.
pub const MAX_DEPTH: usize = 8;

/// Number of parked tasks tracked per resource before the wait queue starts
/// waking everyone early. Woken tasks always re-check the state, so
/// overflowing only costs extra polls.
pub const MAX_WAITERS: usize = 4;

/// What pinning a resource with [`Registry::disable`](crate::Registry::disable)
/// does to one that is already suspended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Only block future suspensions. A suspended resource stays suspended.
    #[default]
    Weak,
    /// Resume a suspended resource (parents first) before returning.
    Strong,
}

/// Registry-wide runtime configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PmConfig {
    /// Behaviour of [`Registry::disable`](crate::Registry::disable).
    pub pin_mode: PinMode,
}

impl PmConfig {
    /// Default configuration: weak pins.
    pub const fn new() -> Self {
        Self { pin_mode: PinMode::Weak }
    }

    /// Replaces the pin mode.
    pub const fn with_pin_mode(mut self, pin_mode: PinMode) -> Self {
        self.pin_mode = pin_mode;
        self
    }
}
