#![forbid(unsafe_code)]

//! Refresh order for computed properties after a write.
//!
//! [`direct`] returns the written property's reverse-map entry as is.
//! [`transitive`] walks the reverse map depth-first and returns every
//! reachable computed property once, ordered so that each one comes after
//! every other refreshed property it reads.

use ahash::AHashMap;

use crate::error::{BindError, Result};

/// Reverse dependency map: property name → computed properties reading it.
pub type ReverseMap = AHashMap<String, Vec<String>>;

/// Direct dependents of `start`, in declaration order.
#[must_use]
pub fn direct(map: &ReverseMap, start: &str) -> Vec<String> {
    map.get(start).cloned().unwrap_or_default()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// All computed properties reachable from `start`, topologically ordered.
///
/// Independent dependents keep their declaration order. A cycle reachable
/// from `start` fails with [`BindError::CyclicDependency`] naming the
/// property where the walk re-entered itself.
pub fn transitive(map: &ReverseMap, start: &str) -> Result<Vec<String>> {
    let mut marks: AHashMap<&str, Mark> = AHashMap::new();
    let mut postorder: Vec<&str> = Vec::new();
    visit(map, start, &mut marks, &mut postorder)?;

    // Reverse postorder is a topological order; the written property leads.
    postorder.pop();
    Ok(postorder.into_iter().rev().map(str::to_owned).collect())
}

fn visit<'m>(
    map: &'m ReverseMap,
    name: &'m str,
    marks: &mut AHashMap<&'m str, Mark>,
    postorder: &mut Vec<&'m str>,
) -> Result<()> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            return Err(BindError::CyclicDependency {
                name: name.to_owned(),
            });
        }
        None => {}
    }
    marks.insert(name, Mark::Visiting);
    if let Some(dependents) = map.get(name) {
        // Reversed so that siblings come out in declaration order.
        for dependent in dependents.iter().rev() {
            visit(map, dependent, marks, postorder)?;
        }
    }
    marks.insert(name, Mark::Done);
    postorder.push(name);
    Ok(())
}
