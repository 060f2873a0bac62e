//! Dataflow engine core data types
//!
//! This crate provides basic data type definitions used by other Emflow crates.
//! Emflow users should not depend on this crate directly. Use `emflow::core` reexport instead.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Graph-wide component identifier
///
/// Identifiers are assigned sequentially in declaration order, starting from zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComponentId(u8);

impl ComponentId {
    const MAX_VALUE: u8 = 0x7f;
    pub const MAX: ComponentId = ComponentId(Self::MAX_VALUE);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<ComponentId> for u8 {
    fn from(value: ComponentId) -> Self {
        value.into_u8()
    }
}

impl From<ComponentId> for usize {
    fn from(value: ComponentId) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for ComponentId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Graph-wide connection identifier
///
/// Identifiers follow bind order. The scheduler uses them to order
/// triggers raised within one component run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId(u8);

impl ConnectionId {
    pub const MAX: ConnectionId = ConnectionId(u8::MAX);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<ConnectionId> for u8 {
    fn from(value: ConnectionId) -> Self {
        value.into_u8()
    }
}

impl From<ConnectionId> for usize {
    fn from(value: ConnectionId) -> Self {
        u8::from(value).into()
    }
}

impl From<u8> for ConnectionId {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

/// Index of a port among the ports of the same direction of one owner
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortIndex(u8);

impl PortIndex {
    const MAX_VALUE: u8 = (PortSet::CAPACITY - 1) as u8;
    pub const MIN: PortIndex = PortIndex(0);
    pub const MAX: PortIndex = PortIndex(Self::MAX_VALUE);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub const fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }
}

impl From<PortIndex> for u8 {
    fn from(value: PortIndex) -> Self {
        value.into_u8()
    }
}

impl From<PortIndex> for usize {
    fn from(value: PortIndex) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for PortIndex {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// A set of port indices
///
/// Components track their filled, mandatory and bound ports with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortSet(u32);

impl PortSet {
    pub const CAPACITY: usize = u32::BITS as usize;
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn into_bits(self) -> u32 {
        self.0
    }

    pub const fn complement(self) -> Self {
        Self(!self.0)
    }

    pub const fn new_eq(index: PortIndex) -> Self {
        Self(1u32 << index.into_u8())
    }

    /// Set of the first `count` indices
    pub const fn new_lt(count: u8) -> Self {
        if count as usize >= Self::CAPACITY {
            Self::ALL
        } else {
            Self((1u32 << count) - 1)
        }
    }

    pub const fn contains(&self, index: PortIndex) -> bool {
        (self.0 >> index.into_u8()) & 0x1 != 0
    }

    pub const fn contains_all(&self, other: PortSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn insert(&mut self, index: PortIndex) {
        self.0 |= Self::new_eq(index).0
    }

    pub const fn remove(&mut self, index: PortIndex) {
        self.0 &= Self::new_eq(index).complement().0
    }

    pub const fn first(&self) -> Option<PortIndex> {
        PortIndex::new(self.0.trailing_zeros() as u8)
    }

    pub const fn last(&self) -> Option<PortIndex> {
        let n = u32::BITS - self.0.leading_zeros();
        PortIndex::new((n as u8).wrapping_sub(1))
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl Default for PortSet {
    fn default() -> Self {
        PortSet::NONE
    }
}

impl core::ops::Not for PortSet {
    type Output = Self;
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl core::ops::BitAnd<PortSet> for PortSet {
    type Output = Self;
    fn bitand(self, rhs: PortSet) -> Self::Output {
        PortSet(self.0 & rhs.0)
    }
}

impl core::ops::BitAndAssign<PortSet> for PortSet {
    fn bitand_assign(&mut self, rhs: PortSet) {
        self.0 &= rhs.0
    }
}

impl core::ops::BitOr<PortSet> for PortSet {
    type Output = Self;
    fn bitor(self, rhs: PortSet) -> Self::Output {
        PortSet(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign<PortSet> for PortSet {
    fn bitor_assign(&mut self, rhs: PortSet) {
        self.0 |= rhs.0;
    }
}

impl core::iter::IntoIterator for PortSet {
    type Item = PortIndex;
    type IntoIter = PortSetIterator;
    fn into_iter(self) -> Self::IntoIter {
        PortSetIterator { residual: self }
    }
}

pub struct PortSetIterator {
    residual: PortSet,
}

impl core::iter::Iterator for PortSetIterator {
    type Item = PortIndex;
    fn next(&mut self) -> Option<Self::Item> {
        let first = self.residual.first();
        if let Some(index) = first {
            self.residual.remove(index);
        }
        first
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
}

/// Port identity
///
/// Ports without an owner belong to the platform: interrupt handlers inject through
/// external outputs and the main loop drains external inputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortAddress {
    pub owner: Option<ComponentId>,
    pub direction: Direction,
    pub index: PortIndex,
}

impl PortAddress {
    pub const fn is_external(&self) -> bool {
        self.owner.is_none()
    }
}

/// Component readiness policy
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Readiness {
    /// Every mandatory input holds a message.
    ///
    /// A component with no mandatory inputs falls back to [`Readiness::Any`].
    #[default]
    All,
    /// At least one input holds a message.
    Any,
}

impl Readiness {
    /// Evaluates the policy over the set of non-empty inputs
    pub const fn is_satisfied(self, filled: PortSet, mandatory: PortSet) -> bool {
        match self {
            Readiness::All if !mandatory.is_empty() => filled.contains_all(mandatory),
            _ => !filled.is_empty(),
        }
    }
}

/// Steady-state fault kinds
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// A message was emitted into a full destination queue
    Overflow { connection: ConnectionId },
    /// A message was emitted on an output with no connection
    Disconnected { port: PortAddress },
    /// A component read from an empty input
    EmptyRead { port: PortAddress },
    /// A component signaled a failure of its own
    Failed { code: u16 },
}

/// Fault record
///
/// `component` is `None` for faults raised by external producers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault {
    pub component: Option<ComponentId>,
    pub kind: FaultKind,
}
