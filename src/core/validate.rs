//! Schema validation of a container tree.
//!
//! Validation never stops at the first problem: every missing, mistyped or
//! empty required attribute is reported, tagged with its node path and key.
//! It only reads the tree, so repeated runs give identical reports.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use super::attribute::{AttributeValue, ValueType};
use super::frame::check_placement;
use super::kind::{classify, Expect, Layout, NodeKind, Requirement};
use super::path::NodePath;
use super::time_base::TimeBaseResolver;
use super::tree::{ContainerTree, NodeRef};
use crate::util::{Error, Result};

/// Why a sensor's time basis could not be resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeBasisIssue {
    /// Neither a `time` vector nor start/interval attributes.
    Missing,
    /// Both a `time` vector and start/interval attributes.
    Ambiguous,
    /// Sample count differs from the shared `time` vector.
    LengthMismatch { expected: usize, actual: usize },
    /// The trial's `time` dataset is not a 1-D real vector.
    InvalidTimeVector,
    /// The sensor or `time` payload was never written.
    NotFinalized,
}

impl fmt::Display for TimeBasisIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing time basis"),
            Self::Ambiguous => f.write_str("ambiguous time basis"),
            Self::LengthMismatch { expected, actual } => write!(
                f,
                "time vector has {} samples, dataset has {}",
                expected, actual
            ),
            Self::InvalidTimeVector => f.write_str("time dataset is not a 1-D real vector"),
            Self::NotFinalized => f.write_str("payload not finalized"),
        }
    }
}

/// Kind of schema violation.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationErrorKind {
    /// Required key absent.
    MissingAttribute,
    /// Key present with the wrong value type.
    WrongType { expected: ValueType, actual: ValueType },
    /// Required string present but empty.
    EmptyRequiredValue,
    /// Sensor time basis problem (only with time-basis checking enabled).
    TimeBasis(TimeBasisIssue),
}

/// A single schema violation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub path: NodePath,
    /// Violated key, when the problem is tied to one.
    pub key: Option<String>,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    fn keyed(path: &NodePath, key: &str, kind: ValidationErrorKind) -> Self {
        Self {
            path: path.clone(),
            key: Some(key.to_string()),
            kind,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(key) = &self.key {
            write!(f, " [{}]", key)?;
        }
        match &self.kind {
            ValidationErrorKind::MissingAttribute => f.write_str(": missing attribute"),
            ValidationErrorKind::WrongType { expected, actual } => {
                write!(f, ": expected {}, got {}", expected, actual)
            }
            ValidationErrorKind::EmptyRequiredValue => f.write_str(": empty value"),
            ValidationErrorKind::TimeBasis(issue) => write!(f, ": {}", issue),
        }
    }
}

/// Validation result: node path to its violations.
///
/// Nodes without violations are absent, so success is an empty report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    errors: BTreeMap<NodePath, Vec<ValidationError>>,
}

impl ValidationReport {
    /// True when no node has violations.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of nodes with violations.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Total number of violations.
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Violations of one node (empty if none).
    pub fn errors_for(&self, path: impl Into<NodePath>) -> &[ValidationError] {
        self.errors
            .get(&path.into())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over `(path, violations)` in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodePath, &[ValidationError])> + '_ {
        self.errors.iter().map(|(p, e)| (p, e.as_slice()))
    }

    fn extend(&mut self, errors: Vec<ValidationError>) {
        for error in errors {
            self.errors.entry(error.path.clone()).or_default().push(error);
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for errors in self.errors.values() {
            for error in errors {
                writeln!(f, "{}", error)?;
            }
        }
        Ok(())
    }
}

/// Cooperative cancellation flag, checked between node visits.
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Checks nodes against their kind's required-attribute contract.
#[derive(Clone, Debug, Default)]
pub struct SchemaValidator {
    check_time_basis: bool,
}

impl SchemaValidator {
    /// Validator with contract checks only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also resolve each sensor's time basis and report failures.
    pub fn with_time_basis_check(mut self, enabled: bool) -> Self {
        self.check_time_basis = enabled;
        self
    }

    /// All contract violations of one node.
    pub fn validate_node(
        &self,
        tree: &ContainerTree,
        layout: Layout,
        node: NodeRef,
    ) -> Result<Vec<ValidationError>> {
        let n = tree.node(node)?;
        let kind = classify(n.path(), n.is_group(), layout);
        let mut errors = check_contract(n.path(), n.attributes(), kind.contract());

        if self.check_time_basis && kind == NodeKind::SensorDataset {
            let resolver = TimeBaseResolver::new(tree, layout);
            if let Err(e) = resolver.basis_of(node) {
                errors.push(time_basis_error(n.path(), e)?);
            }
        }
        Ok(errors)
    }

    /// Validate every node, depth first.
    pub fn validate_tree(&self, tree: &ContainerTree, layout: Layout) -> Result<ValidationReport> {
        self.validate_tree_with_cancel(tree, layout, &CancelToken::new())
    }

    /// Validate every node, stopping with `Cancelled` between node visits
    /// once `cancel` is set.
    pub fn validate_tree_with_cancel(
        &self,
        tree: &ContainerTree,
        layout: Layout,
        cancel: &CancelToken,
    ) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for (path, node) in tree.walk() {
            if cancel.is_cancelled() {
                tracing::debug!(%path, "validation cancelled");
                return Err(Error::Cancelled);
            }
            report.extend(self.validate_node(tree, layout, node)?);
        }
        tracing::debug!(nodes = tree.len(), failing = report.len(), "validated tree");
        Ok(report)
    }
}

fn check_contract(
    path: &NodePath,
    attrs: &super::AttributeStore,
    contract: &[Requirement],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for req in contract {
        let Some(value) = attrs.get(req.key) else {
            errors.push(ValidationError::keyed(path, req.key, ValidationErrorKind::MissingAttribute));
            continue;
        };
        if let Err(kind) = check_value(req.expect, value) {
            errors.push(ValidationError::keyed(path, req.key, kind));
        }
    }
    errors
}

fn check_value(expect: Expect, value: &AttributeValue) -> std::result::Result<(), ValidationErrorKind> {
    match expect {
        Expect::Vector3 => check_placement(value),
        Expect::Text => match value.as_str() {
            Some(s) if s.trim().is_empty() => Err(ValidationErrorKind::EmptyRequiredValue),
            Some(_) => Ok(()),
            None => Err(ValidationErrorKind::WrongType {
                expected: expect.value_type(),
                actual: value.value_type(),
            }),
        },
        Expect::Real if expect.accepts(value) => Ok(()),
        Expect::Real => Err(ValidationErrorKind::WrongType {
            expected: expect.value_type(),
            actual: value.value_type(),
        }),
    }
}

/// Turn a resolver failure into a report entry. Failures outside the
/// time-base taxonomy are real errors and propagate.
fn time_basis_error(sensor: &NodePath, err: Error) -> Result<ValidationError> {
    let (key, kind) = match err {
        Error::MissingTimeBasis(_) => (None, ValidationErrorKind::TimeBasis(TimeBasisIssue::Missing)),
        Error::AmbiguousTimeBasis(_) => (None, ValidationErrorKind::TimeBasis(TimeBasisIssue::Ambiguous)),
        Error::TimeLengthMismatch { expected, actual, .. } => (
            None,
            ValidationErrorKind::TimeBasis(TimeBasisIssue::LengthMismatch { expected, actual }),
        ),
        Error::InvalidTimeVector(_) => (
            None,
            ValidationErrorKind::TimeBasis(TimeBasisIssue::InvalidTimeVector),
        ),
        Error::NotFinalized(_) => (None, ValidationErrorKind::TimeBasis(TimeBasisIssue::NotFinalized)),
        Error::AttributeType { key, expected, actual, .. } => {
            (Some(key), ValidationErrorKind::WrongType { expected, actual })
        }
        other => return Err(other),
    };
    Ok(ValidationError {
        path: sensor.clone(),
        key,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SampleArray, SAMPLING_INTERVAL_KEY, START_TIME_KEY};
    use crate::util::ElementType;

    fn complete_tree() -> ContainerTree {
        let mut tree = ContainerTree::new();
        let root = tree.root();
        for (k, v) in [
            ("name", "Demo"),
            ("contact", "x"),
            ("description", "y"),
            ("location", "z"),
            ("coordinate-system", "c"),
        ] {
            tree.set_attribute(root, k, v).unwrap();
        }
        let trial = tree.add_group("/", "trial 1").unwrap();
        tree.set_attribute(trial, "name", "trial 1").unwrap();
        tree.set_attribute(trial, "description", "ambient").unwrap();
        let a1 = tree.add_dataset("/trial 1", "A1", ElementType::Float64).unwrap();
        tree.set_attribute(a1, "name", "A1").unwrap();
        tree.set_attribute(a1, "coordinate", [0.0, 1.0, 2.0]).unwrap();
        tree.set_attribute(a1, "orientation", [0.0, 0.0, 1.0]).unwrap();
        tree.set_attribute(a1, "description", "accelerometer").unwrap();
        tree.set_attribute(a1, "unit", "m/s^2").unwrap();
        tree.set_attribute(a1, "conversion", 1.0).unwrap();
        tree.finalize(a1, SampleArray::from_slice(&[0.0f64; 4])).unwrap();
        tree
    }

    #[test]
    fn test_complete_tree_is_valid() {
        let tree = complete_tree();
        let report = SchemaValidator::new().validate_tree(&tree, Layout::SingleProject).unwrap();
        assert!(report.is_empty(), "{}", report);
    }

    #[test]
    fn test_missing_unit_single_error() {
        let mut tree = ContainerTree::new();
        tree.add_group("/", "trial 1").unwrap();
        let a1 = tree.add_dataset("/trial 1", "A1", ElementType::Float64).unwrap();
        tree.set_attribute(a1, "name", "A1").unwrap();
        tree.set_attribute(a1, "coordinate", [0.0, 1.0, 2.0]).unwrap();
        tree.set_attribute(a1, "orientation", [0.0, 0.0, 1.0]).unwrap();
        tree.set_attribute(a1, "description", "accelerometer").unwrap();
        tree.set_attribute(a1, "conversion", 1.0).unwrap();

        let errors = SchemaValidator::new()
            .validate_node(&tree, Layout::SingleProject, a1)
            .unwrap();
        assert_eq!(
            errors,
            vec![ValidationError {
                path: NodePath::parse("/trial 1/A1"),
                key: Some("unit".to_string()),
                kind: ValidationErrorKind::MissingAttribute,
            }]
        );
    }

    #[test]
    fn test_collects_all_violations() {
        let mut tree = complete_tree();
        let root = tree.root();
        tree.set_attribute(root, "contact", "  ").unwrap();
        tree.set_attribute(root, "location", 3.0).unwrap();
        let a1 = tree.resolve("/trial 1/A1").unwrap();
        tree.set_attribute(a1, "orientation", vec![0.0, 1.0]).unwrap();
        tree.set_attribute(a1, "conversion", "x2").unwrap();

        let report = SchemaValidator::new().validate_tree(&tree, Layout::SingleProject).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.error_count(), 4);

        let root_errors = report.errors_for("/");
        assert_eq!(root_errors[0].kind, ValidationErrorKind::EmptyRequiredValue);
        assert_eq!(
            root_errors[1].kind,
            ValidationErrorKind::WrongType {
                expected: ValueType::Text,
                actual: ValueType::Real
            }
        );
        let sensor_errors = report.errors_for("/trial 1/A1");
        assert_eq!(sensor_errors[0].key.as_deref(), Some("orientation"));
        assert_eq!(sensor_errors[1].key.as_deref(), Some("conversion"));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let mut tree = complete_tree();
        let root = tree.root();
        tree.set_attribute(root, "name", "").unwrap();
        let validator = SchemaValidator::new();
        let first = validator.validate_tree(&tree, Layout::SingleProject).unwrap();
        let second = validator.validate_tree(&tree, Layout::SingleProject).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.error_count(), 1);
    }

    #[test]
    fn test_time_basis_check() {
        let tree = complete_tree();
        let plain = SchemaValidator::new().validate_tree(&tree, Layout::SingleProject).unwrap();
        assert!(plain.is_empty());

        let checked = SchemaValidator::new()
            .with_time_basis_check(true)
            .validate_tree(&tree, Layout::SingleProject).unwrap();
        assert_eq!(
            checked.errors_for("/trial 1/A1")[0].kind,
            ValidationErrorKind::TimeBasis(TimeBasisIssue::Missing)
        );

        let mut tree = tree;
        let a1 = tree.resolve("/trial 1/A1").unwrap();
        tree.set_attribute(a1, START_TIME_KEY, 0.0).unwrap();
        tree.set_attribute(a1, SAMPLING_INTERVAL_KEY, 0.01).unwrap();
        let checked = SchemaValidator::new()
            .with_time_basis_check(true)
            .validate_tree(&tree, Layout::SingleProject).unwrap();
        assert!(checked.is_empty(), "{}", checked);
    }

    #[test]
    fn test_cancellation() {
        let tree = complete_tree();
        let token = CancelToken::new();
        token.cancel();
        let result =
            SchemaValidator::new().validate_tree_with_cancel(&tree, Layout::SingleProject, &token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_report_display() {
        let mut tree = complete_tree();
        let root = tree.root();
        tree.set_attribute(root, "name", "").unwrap();
        let report = SchemaValidator::new().validate_tree(&tree, Layout::SingleProject).unwrap();
        assert_eq!(report.to_string(), "/ [name]: empty value\n");
    }
}
