//! Per-element rules: class compatibility, value types, and the shape
//! constraints of each payload.

use std::cmp::Ordering;

use fcst_config::ValidationConfig;
use fcst_core::entities::Target;
use fcst_core::enums::{NamedFamily, PredClass, TargetType};
use fcst_core::prediction::{
    BinData, NamedData, PredictionData, PredictionElement, QuantileData, SampleData,
};
use fcst_core::value::PredValue;

use crate::report::{Rule, Violation};

/// Collects violations for one element.
struct Checker<'a> {
    index: usize,
    element: &'a PredictionElement,
    target: &'a Target,
    config: &'a ValidationConfig,
    violations: Vec<Violation>,
}

impl Checker<'_> {
    fn fail(&mut self, rule: Rule, message: impl Into<String>) {
        self.violations
            .push(Violation::at(rule, self.index, self.element, message));
    }

    /// Report `value` when it does not fit the target's value type.
    fn check_value(&mut self, what: &str, value: &PredValue) {
        if let Err((rule, message)) = value_fits(self.target, value) {
            self.fail(rule, format!("{what} {value}: {message}"));
        }
    }

    fn check_scalar(&mut self, class: PredClass, value: &PredValue) {
        if matches!(class, PredClass::Mean | PredClass::Median) && !value.is_numeric() {
            self.fail(
                Rule::NonNumericCentral,
                format!("{class} value {value} is not numeric"),
            );
            return;
        }
        self.check_value("value", value);
    }

    fn check_named(&mut self, data: &NamedData) {
        let Some(family) = NamedFamily::from_token(&data.family) else {
            self.fail(
                Rule::UnknownFamily,
                format!("unrecognized family {:?}", data.family),
            );
            return;
        };
        if family.target_type() != self.target.target_type {
            self.fail(
                Rule::FamilyTargetMismatch,
                format!(
                    "family {family} applies to {} targets, not {}",
                    family.target_type(),
                    self.target.target_type
                ),
            );
        }
        if data.params.len() != family.param_count() {
            self.fail(
                Rule::ParamCount,
                format!(
                    "family {family} takes {} parameter(s), got {}",
                    family.param_count(),
                    data.params.len()
                ),
            );
            return;
        }
        if let Some(message) = param_problem(family, &data.params) {
            self.fail(Rule::ParamRange, message);
        }
    }

    fn check_bin(&mut self, data: &BinData) {
        if data.entries.is_empty() {
            self.fail(Rule::BinEmpty, "bin has no categories");
            return;
        }
        let mut sum = 0.0;
        for (i, entry) in data.entries.iter().enumerate() {
            if !(0.0..=1.0).contains(&entry.prob) {
                self.fail(
                    Rule::BinProbabilityRange,
                    format!(
                        "probability {} for category {} is outside [0, 1]",
                        entry.prob, entry.cat
                    ),
                );
            }
            sum += entry.prob;
            if data.entries[..i].iter().any(|earlier| earlier.cat.same_value(&entry.cat)) {
                self.fail(
                    Rule::BinDuplicateCategory,
                    format!("category {} appears more than once", entry.cat),
                );
            }
            self.check_value("category", &entry.cat);
        }
        if !sum.is_finite() || (sum - 1.0).abs() > self.config.bin_sum_tolerance {
            self.fail(Rule::BinSum, format!("probabilities sum to {sum}, expected 1"));
        }
    }

    fn check_sample(&mut self, data: &SampleData) {
        if data.samples.is_empty() {
            self.fail(Rule::SampleEmpty, "sample has no draws");
            return;
        }
        for sample in &data.samples {
            self.check_value("sample", sample);
        }
    }

    fn check_quantile(&mut self, data: &QuantileData) {
        if data.entries.is_empty() {
            self.fail(Rule::QuantileEmpty, "quantile has no levels");
            return;
        }
        let mut typed = true;
        for entry in &data.entries {
            if !(0.0..=1.0).contains(&entry.quantile) {
                self.fail(
                    Rule::QuantileLevelRange,
                    format!("quantile level {} is outside [0, 1]", entry.quantile),
                );
            }
            if value_fits(self.target, &entry.value).is_err() {
                typed = false;
            }
            self.check_value("quantile value", &entry.value);
        }

        let tolerance = self.config.quantile_value_rel_tolerance;
        let mut ordered: Vec<_> = data.entries.iter().collect();
        ordered.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));
        for pair in ordered.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            if low.quantile.total_cmp(&high.quantile) == Ordering::Equal {
                self.fail(
                    Rule::QuantileDuplicateLevel,
                    format!("quantile level {} appears more than once", low.quantile),
                );
            } else if typed && !non_decreasing(&low.value, &high.value, tolerance) {
                self.fail(
                    Rule::QuantileMonotonic,
                    format!(
                        "value {} at level {} is below value {} at level {}",
                        high.value, high.quantile, low.value, low.quantile
                    ),
                );
            }
        }
    }
}

/// Whether `value` has the value type the target expects.
fn value_fits(target: &Target, value: &PredValue) -> Result<(), (Rule, String)> {
    let type_error = |expected: &str| {
        Err((
            Rule::ValueType,
            format!("expected {expected} for {} target", target.target_type),
        ))
    };
    match target.target_type {
        TargetType::Continuous if !value.is_numeric() => type_error("a number"),
        TargetType::Discrete => match value {
            PredValue::Int(_) => Ok(()),
            PredValue::Float(float) if float.fract() == 0.0 => Ok(()),
            _ => type_error("an integer"),
        },
        TargetType::Nominal => match value {
            PredValue::Text(text) => {
                if target.cats.is_empty() || target.cats.iter().any(|cat| cat == text) {
                    Ok(())
                } else {
                    Err((
                        Rule::CategoryNotAllowed,
                        format!("not one of the target's categories {:?}", target.cats),
                    ))
                }
            }
            _ => type_error("text"),
        },
        TargetType::Binary if !matches!(value, PredValue::Bool(_)) => type_error("true or false"),
        TargetType::Date if value.as_date().is_none() => type_error("a YYYY-MM-DD date"),
        _ => Ok(()),
    }
}

/// Parameter range problem of a family whose parameter count is right.
fn param_problem(family: NamedFamily, params: &[f64]) -> Option<String> {
    if let Some(param) = params.iter().find(|param| !param.is_finite()) {
        return Some(format!("parameter {param} is not finite"));
    }
    let positive = |i: usize, name: &str| {
        (params[i] <= 0.0).then(|| format!("{family} {name} must be > 0, got {}", params[i]))
    };
    match family {
        NamedFamily::Norm | NamedFamily::Lnorm => positive(1, "sd"),
        NamedFamily::Gamma => positive(0, "shape").or_else(|| positive(1, "rate")),
        NamedFamily::Beta => positive(0, "a").or_else(|| positive(1, "b")),
        NamedFamily::Pois => positive(0, "mean"),
        NamedFamily::Nbinom => positive(0, "r").or_else(|| {
            (!(0.0..=1.0).contains(&params[1]))
                .then(|| format!("nbinom p must be in [0, 1], got {}", params[1]))
        }),
        NamedFamily::Nbinom2 => positive(0, "mean").or_else(|| positive(1, "dispersion")),
    }
}

/// Whether `high` does not fall below `low`. Numbers within the relative
/// tolerance count as equal.
fn non_decreasing(low: &PredValue, high: &PredValue, rel_tolerance: f64) -> bool {
    if let (Some(a), Some(b)) = (low.as_f64(), high.as_f64()) {
        return a <= b || (a - b).abs() <= rel_tolerance * a.abs().max(b.abs());
    }
    if let (Some(a), Some(b)) = (low.as_date(), high.as_date()) {
        return a <= b;
    }
    low.canonical_cmp(high) != Ordering::Greater
}

/// Every per-element rule `element` breaks for `target`.
///
/// A class the target type does not accept is reported alone, since the
/// payload rules assume a compatible target.
#[must_use]
pub fn check_element(
    index: usize,
    element: &PredictionElement,
    target: &Target,
    config: &ValidationConfig,
) -> Vec<Violation> {
    let mut checker = Checker {
        index,
        element,
        target,
        config,
        violations: Vec::new(),
    };

    let class = element.pred_class();
    if !target.target_type.accepts(class) {
        checker.fail(
            Rule::ClassNotAllowed,
            format!("{} targets do not accept {class} predictions", target.target_type),
        );
        return checker.violations;
    }

    match element.data() {
        None => {}
        Some(PredictionData::Named(data)) => checker.check_named(data),
        Some(PredictionData::Bin(data)) => checker.check_bin(data),
        Some(PredictionData::Sample(data)) => checker.check_sample(data),
        Some(PredictionData::Quantile(data)) => checker.check_quantile(data),
        Some(data) => {
            if let Some(scalar) = data.as_scalar() {
                checker.check_scalar(class, &scalar.value);
            }
        }
    }
    checker.violations
}
