//! Import order: referenced collections before the collections that point at them.

use serde::Serialize;

use super::spec::MappingSpec;

/// Order in which generated collections should be imported into the CRM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOrder {
    /// Every collection, dependencies first
    pub ordered: Vec<String>,
    /// Collections on, or depending on, a reference cycle; appended to `ordered` in
    /// declaration order since no valid order exists for them
    pub cyclic: Vec<String>,
}

impl ImportOrder {
    pub fn has_cycles(&self) -> bool {
        !self.cyclic.is_empty()
    }
}

impl MappingSpec {
    /// Stable topological sort of collections over their reference edges.
    ///
    /// Ties are broken by declaration order. Self-references are ignored and
    /// references to undeclared collections contribute no edge.
    pub fn import_order(&self) -> ImportOrder {
        let names = self.names();
        let n = names.len();
        let index_of = |name: &str| names.iter().position(|c| c == name);

        // remaining[i]: unsatisfied dependencies of i; dependents[j]: collections referencing j
        let mut remaining = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, (_, mapping)) in self.iter().enumerate() {
            for referenced in mapping.referenced_collections() {
                match index_of(referenced) {
                    Some(j) if j != i => {
                        remaining[i] += 1;
                        dependents[j].push(i);
                    }
                    _ => {}
                }
            }
        }

        let mut done = vec![false; n];
        let mut ordered = Vec::with_capacity(n);
        // Always take the lowest-index ready collection
        while let Some(next) = (0..n).find(|&i| !done[i] && remaining[i] == 0) {
            done[next] = true;
            ordered.push(names[next].clone());
            for &dependent in &dependents[next] {
                remaining[dependent] -= 1;
            }
        }

        let cyclic: Vec<String> = (0..n)
            .filter(|&i| !done[i])
            .map(|i| names[i].clone())
            .collect();
        if !cyclic.is_empty() {
            tracing::warn!(
                collections = ?cyclic,
                "reference cycle between collections; import order for them is arbitrary"
            );
        }
        ordered.extend(cyclic.iter().cloned());

        ImportOrder { ordered, cyclic }
    }
}
