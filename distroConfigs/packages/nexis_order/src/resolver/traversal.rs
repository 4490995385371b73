//! Post-order walk of a finished tree.

use fnv::FnvHashSet;

use crate::store::{NodeStore, StoreError};
use crate::tree::{Node, PackageId};

/// Build order of the tree rooted at `root`.
///
/// Children are visited in declaration order and every id is emitted after
/// the ids below it, so each package follows its dependencies. `root` comes
/// last. The walk only reads the store; calling it twice on the same tree
/// gives the same sequence.
pub fn build_order<S: NodeStore + ?Sized>(store: &S, root: &str) -> Result<Vec<PackageId>, StoreError> {
    let root_node = store.get(root)?;
    let mut order = Vec::with_capacity(store.len());
    let mut visited = FnvHashSet::default();
    visited.insert(root_node.id.clone());

    visit(store, &root_node, &mut visited, &mut order)?;
    order.push(root_node.id);
    Ok(order)
}

fn visit<S: NodeStore + ?Sized>(
    store: &S,
    node: &Node,
    visited: &mut FnvHashSet<PackageId>,
    order: &mut Vec<PackageId>,
) -> Result<(), StoreError> {
    for edge in &node.edges {
        if !visited.insert(edge.target.clone()) {
            continue;
        }

        let child = store.get(&edge.target)?;
        if !child.external && !child.is_leaf() {
            visit(store, &child, visited, order)?;
        }
        order.push(child.id);
    }
    Ok(())
}
