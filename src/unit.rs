//! Schedulable units of work derived from the project spec.

use serde::{Deserialize, Serialize};

use crate::spec::{ProjectSpec, QualityRule, ServiceKind};

/// One schedulable piece of work — a single service to implement,
/// verify, and commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique unit name, equal to the service name.
    pub name: String,
    /// Service category, used for prompt guidance.
    pub kind: ServiceKind,
    /// Prompt-ready description handed to the code generator.
    pub description: String,
    /// Names of units that must succeed before this one starts.
    pub dependencies: Vec<String>,
    /// Quality rules gating this unit's QA phase.
    pub quality_rules: Vec<QualityRule>,
    /// Build/test command override, if the spec declares one.
    pub build_command: Option<String>,
}

/// Derives the unit list from a project spec, one unit per service in
/// declaration order. Position in the returned list is the
/// deterministic tie-break when several units are ready at once.
///
/// The description is enriched with a kind hint so the code generator
/// knows what sort of service it is producing.
#[must_use]
pub fn plan_units(spec: &ProjectSpec) -> Vec<Unit> {
    spec.services
        .iter()
        .map(|service| Unit {
            name: service.name.clone(),
            kind: service.kind,
            description: format!(
                "Service: {}\nType: {}\nDescription: {}\nUse best practices for {} services.",
                service.name,
                service.kind.label(),
                service.description,
                service.kind.label(),
            ),
            dependencies: service.dependencies.clone(),
            quality_rules: service.quality_rules.clone(),
            build_command: service.build_command.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ServiceSpec;

    fn sample_project() -> ProjectSpec {
        ProjectSpec {
            name: "demo".to_string(),
            version: "0.1".to_string(),
            repository_url: "https://example.com/demo.git".to_string(),
            branch: "main".to_string(),
            services: vec![
                ServiceSpec {
                    name: "api".to_string(),
                    kind: ServiceKind::Backend,
                    description: "REST API".to_string(),
                    dependencies: vec![],
                    quality_rules: vec![],
                    build_command: None,
                },
                ServiceSpec {
                    name: "web".to_string(),
                    kind: ServiceKind::Frontend,
                    description: "Web UI".to_string(),
                    dependencies: vec!["api".to_string()],
                    quality_rules: vec![],
                    build_command: Some("npm test".to_string()),
                },
            ],
        }
    }

    #[test]
    fn one_unit_per_service_in_declaration_order() {
        let units = plan_units(&sample_project());
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "api");
        assert_eq!(units[1].name, "web");
        assert_eq!(units[1].dependencies, vec!["api"]);
        assert_eq!(units[1].build_command.as_deref(), Some("npm test"));
    }

    #[test]
    fn description_carries_kind_hint() {
        let units = plan_units(&sample_project());
        assert!(units[0].description.contains("Type: backend"));
        assert!(units[0].description.contains("REST API"));
        assert!(units[1].description.contains("frontend services"));
    }
}
