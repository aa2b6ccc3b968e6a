//! `plan` command: validate a spec and print the execution order.

use std::collections::HashSet;
use std::path::Path;

use crate::graph::DependencyGraph;
use crate::spec;
use crate::unit::{plan_units, Unit};

/// Loads the spec, validates the dependency graph, and prints the
/// order a sequential run would execute the units in.
///
/// # Errors
///
/// Returns an error string if the spec cannot be loaded or the
/// dependency graph is invalid.
pub fn run(spec_path: &Path) -> Result<(), String> {
    let project = spec::load_project_spec(spec_path)?;
    let units = plan_units(&project);
    let graph = DependencyGraph::build(units).map_err(|e| e.to_string())?;

    println!("Project: {} v{}", project.name, project.version);
    println!("Units ({}):", graph.units().len());
    for (position, unit) in execution_order(&graph).iter().enumerate() {
        let deps = if unit.dependencies.is_empty() {
            String::new()
        } else {
            format!("  (after {})", unit.dependencies.join(", "))
        };
        println!("  {}. {} [{}]{}", position + 1, unit.name, unit.kind.label(), deps);
    }
    Ok(())
}

/// The order a `concurrency = 1` run executes units in: repeatedly the
/// first declared unit whose dependencies are all done.
fn execution_order(graph: &DependencyGraph) -> Vec<&Unit> {
    let mut done: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();
    while order.len() < graph.units().len() {
        let Some(next) = graph.units().iter().find(|unit| {
            !done.contains(unit.name.as_str())
                && unit.dependencies.iter().all(|dep| done.contains(dep.as_str()))
        }) else {
            break;
        };
        done.insert(next.name.as_str());
        order.push(next);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ServiceKind;

    fn unit(name: &str, deps: &[&str]) -> Unit {
        Unit {
            name: name.to_string(),
            kind: ServiceKind::Backend,
            description: String::new(),
            dependencies: deps.iter().map(ToString::to_string).collect(),
            quality_rules: vec![],
            build_command: None,
        }
    }

    #[test]
    fn order_respects_dependencies_then_declaration() {
        let graph = DependencyGraph::build(vec![
            unit("web", &["api"]),
            unit("api", &[]),
            unit("worker", &["api"]),
        ])
        .unwrap();
        let order: Vec<&str> =
            execution_order(&graph).iter().map(|u| u.name.as_str()).collect();
        assert_eq!(order, vec!["api", "web", "worker"]);
    }
}
