/// Identifies one contractor pin in a deterministic, stable way.
///
/// This is intentionally a small, copyable handle so it can be used as a
/// key in ordered structures without heap allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(pub u64);

/// Identifies a cluster by the hash of its sorted membership.
///
/// Two clusters with the same member pins get the same id regardless of
/// pin ordering, which keeps render keys stable across passes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(pub u64);
