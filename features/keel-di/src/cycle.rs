use std::fmt::Display;

use thiserror::Error;

/// A node of a dependency graph which can be checked for cycles
pub trait DependencyNode: Clone + PartialEq + Display {
    fn dependencies(&self) -> Vec<Self>;
}

/// A circular dependency
///
/// `chain` is the dependency path in visiting order, ending with the node that closed the loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", chain.join(" -> "))]
pub struct CycleError {
    pub chain: Vec<String>,
}

/// Checks everything reachable from `root` for cycles
///
/// A node depending on itself is ignored.
pub fn check<N: DependencyNode>(root: &N) -> Result<(), CycleError> {
    let mut checked = Vec::new();
    let mut path = vec![root.clone()];
    return check_recurse(&mut checked, &mut path);

    fn check_recurse<N: DependencyNode>(
        checked: &mut Vec<N>,
        path: &mut Vec<N>,
    ) -> Result<(), CycleError> {
        let Some(node) = path.last().cloned() else {
            return Ok(());
        };

        for dependency in node.dependencies() {
            if dependency == node || checked.contains(&dependency) {
                continue;
            }

            if path.contains(&dependency) {
                let chain = path
                    .iter()
                    .chain(std::iter::once(&dependency))
                    .map(ToString::to_string)
                    .collect();
                return Err(CycleError { chain });
            }

            path.push(dependency);
            check_recurse(checked, path)?;
            path.pop();
        }

        // Everything below this node is cycle free
        checked.push(node);
        Ok(())
    }
}
