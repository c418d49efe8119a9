//! Node interning.
//!
//! Nodes are identified by case-insensitive name. `gnd` (and the literal
//! `0`) is the distinguished reference potential and is never assigned an
//! unknown in the MNA system. The interner is owned by the circuit -- never
//! a process-wide singleton -- so two circuits built in the same process
//! never share node identity.

use std::collections::HashMap;

/// A stable, dense index into a circuit's non-ground node list.
///
/// Ground itself has no `NodeId`; callers test [`NodeInterner::is_ground`]
/// before treating a name as an unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Interns node names to stable indices in first-touch order.
///
/// "First-touch order" means: the first component that mentions a node name
/// determines that node's index. This is part of the public ordering
/// contract (spec-level invariant), not an implementation detail.
#[derive(Debug, Clone, Default)]
pub struct NodeInterner {
    names: Vec<String>,
    index: HashMap<String, NodeId>,
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn is_ground_name(normalized: &str) -> bool {
    normalized == "0" || normalized == "gnd"
}

impl NodeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ground(&self, name: &str) -> bool {
        is_ground_name(&normalize(name))
    }

    /// Intern `name`, returning `None` if it is the ground node.
    pub fn intern(&mut self, name: &str) -> Option<NodeId> {
        let normalized = normalize(name);
        if is_ground_name(&normalized) {
            return None;
        }
        if let Some(&id) = self.index.get(&normalized) {
            return Some(id);
        }
        let id = NodeId(self.names.len());
        self.names.push(normalized.clone());
        self.index.insert(normalized, id);
        Some(id)
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        let normalized = normalize(name);
        self.index.get(&normalized).copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id.0]
    }

    /// Number of non-ground nodes -- the count of node unknowns in the MNA
    /// system.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_aliases_are_recognized() {
        let mut interner = NodeInterner::new();
        assert_eq!(interner.intern("0"), None);
        assert_eq!(interner.intern("GND"), None);
        assert_eq!(interner.intern("gnd"), None);
    }

    #[test]
    fn first_touch_order_is_stable() {
        let mut interner = NodeInterner::new();
        let b = interner.intern("nodeB").unwrap();
        let a = interner.intern("nodeA").unwrap();
        assert_eq!(b, NodeId(0));
        assert_eq!(a, NodeId(1));
        // Re-interning returns the same id.
        assert_eq!(interner.intern("NODEB"), Some(b));
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut interner = NodeInterner::new();
        let id = interner.intern("Nin").unwrap();
        assert_eq!(interner.lookup("NIN"), Some(id));
    }
}
