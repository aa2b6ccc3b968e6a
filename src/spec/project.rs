//! Project specification types.

use serde::{Deserialize, Serialize};

/// The category of a service, which shapes prompt guidance and which
/// quality rules typically apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Server-side API or worker.
    Backend,
    /// Browser-facing UI.
    Frontend,
    /// Machine-learning service gated by numeric metrics.
    Ml,
    /// Audio processing service gated by numeric metrics.
    Audio,
    /// Anything else.
    Other,
}

impl ServiceKind {
    /// Short lowercase label used in prompts and log lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Ml => "ml",
            Self::Audio => "audio",
            Self::Other => "other",
        }
    }
}

/// Comparison operator applied by a quality rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Observed value must be strictly less than the threshold.
    #[serde(rename = "<")]
    Lt,
    /// Observed value must be less than or equal to the threshold.
    #[serde(rename = "<=")]
    Le,
    /// Observed value must be strictly greater than the threshold.
    #[serde(rename = ">")]
    Gt,
    /// Observed value must be greater than or equal to the threshold.
    #[serde(rename = ">=")]
    Ge,
    /// Observed value must equal the threshold exactly.
    #[serde(rename = "==")]
    Eq,
    /// Observed value must differ from the threshold.
    #[serde(rename = "!=")]
    Ne,
}

impl CompareOp {
    /// Applies the operator to an observed value and a threshold.
    ///
    /// Equality is literal `f64` comparison; rules that need tolerance
    /// must encode it as a `<`/`>` pair.
    #[must_use]
    pub fn holds(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => observed < threshold,
            Self::Le => observed <= threshold,
            Self::Gt => observed > threshold,
            Self::Ge => observed >= threshold,
            #[allow(clippy::float_cmp)]
            Self::Eq => observed == threshold,
            #[allow(clippy::float_cmp)]
            Self::Ne => observed != threshold,
        }
    }

    /// The operator as written in spec files.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A named metric threshold gating progression past the QA phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRule {
    /// Metric name as emitted by the build/test collaborator.
    pub metric: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Numeric threshold the observation is compared against.
    pub threshold: f64,
}

impl std::fmt::Display for QualityRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.metric, self.op, self.threshold)
    }
}

/// One service declared in the project spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name; dependency references use these names.
    pub name: String,
    /// Service category.
    pub kind: ServiceKind,
    /// Free-form description handed to the code-generation collaborator.
    pub description: String,
    /// Names of services this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Quality rules gating this service's QA phase.
    #[serde(default)]
    pub quality_rules: Vec<QualityRule>,
    /// Command used to build and test this service. Empty means the
    /// build runner's default for the service kind.
    #[serde(default)]
    pub build_command: Option<String>,
}

/// The full project specification loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Project name.
    pub name: String,
    /// Project version string.
    pub version: String,
    /// Remote repository the run pushes to.
    pub repository_url: String,
    /// Branch pushed to after each successful commit.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Services in declaration order; this order is the scheduling
    /// tie-break.
    pub services: Vec<ServiceSpec>,
}

fn default_branch() -> String {
    "main".to_string()
}
