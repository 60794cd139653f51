//! Decision variables.

/// Index of a variable in the [`CpModel`](super::CpModel) that declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Integer decision variable over the closed range `[min, max]`.
///
/// In this crate a variable is usually a match slot (which pseudo-team sits
/// in zone `z` of match `m`) or a relabeling (which real team stands in for
/// pseudo-team `p`), so domains are small and dense.
#[derive(Debug, Clone)]
pub struct IntVar {
    /// Shown in diagnostics, e.g. `match-3-1`.
    pub name: String,
    pub min: i64,
    pub max: i64,

    /// Pinned value. The solver tries nothing else.
    pub fixed: Option<i64>,
}

impl IntVar {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            fixed: None,
        }
    }

    /// A variable pinned to `value`.
    pub fn fixed(name: impl Into<String>, value: i64) -> Self {
        Self {
            fixed: Some(value),
            ..Self::new(name, value, value)
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    /// Number of admissible values; 0 when `min > max`.
    pub fn domain_size(&self) -> i64 {
        (self.max - self.min + 1).max(0)
    }

    pub fn admits(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_domain() {
        let slot = IntVar::new("match-0-0", 0, 11);
        assert_eq!(slot.domain_size(), 12);
        assert!(!slot.is_fixed());
        assert!(slot.admits(0) && slot.admits(11));
        assert!(!slot.admits(12) && !slot.admits(-1));
    }

    #[test]
    fn test_pinned_variable() {
        let pi = IntVar::fixed("pi-0", 5);
        assert!(pi.is_fixed());
        assert_eq!(pi.domain_size(), 1);
        assert!(pi.admits(5));
    }

    #[test]
    fn test_empty_domain() {
        assert_eq!(IntVar::new("z", 3, 1).domain_size(), 0);
    }
}
