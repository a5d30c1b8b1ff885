use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::dtype::DataType;
use crate::error::{Error, Result};

/// Attribute map of a dataset or variable.
pub type Attrs = serde_json::Map<String, Value>;

/// Numeric values of a variable, if they were requested.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// Values in C order, converted to `f64`.
    Loaded(Vec<f64>),
    /// 64-bit integer, datetime or timedelta values kept exact; `None` is NaT.
    Exact(Vec<Option<i64>>),
    /// Values were requested but could not be decoded.
    Unavailable(String),
}

impl Values {
    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Values::Loaded(values) => Some(values),
            Values::Exact(_) | Values::Unavailable(_) => None,
        }
    }

    /// Number of values held, if any were decoded.
    pub fn len(&self) -> Option<usize> {
        match self {
            Values::Loaded(values) => Some(values.len()),
            Values::Exact(values) => Some(values.len()),
            Values::Unavailable(_) => None,
        }
    }

    /// Each value greater than the one before; NaN and NaT never compare.
    pub fn is_strictly_increasing(&self) -> bool {
        self.all_pairs(|a, b| b > a, |a, b| b > a)
    }

    pub fn is_strictly_decreasing(&self) -> bool {
        self.all_pairs(|a, b| b < a, |a, b| b < a)
    }

    fn all_pairs(
        &self,
        float: impl Fn(f64, f64) -> bool,
        exact: impl Fn(i64, i64) -> bool,
    ) -> bool {
        match self {
            Values::Loaded(values) => values.windows(2).all(|pair| float(pair[0], pair[1])),
            Values::Exact(values) => values.windows(2).all(|pair| match (pair[0], pair[1]) {
                (Some(a), Some(b)) => exact(a, b),
                _ => false,
            }),
            Values::Unavailable(_) => false,
        }
    }
}

/// A named, labeled n-dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub dtype: DataType,
    pub fill_value: Option<f64>,
    pub attrs: Attrs,
    pub values: Option<Values>,
}

impl Variable {
    /// Create a variable without attributes or values, chunked as a whole.
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        dtype: DataType,
        dims: &[S],
        shape: Vec<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            dims: dims.iter().map(|dim| dim.as_ref().to_string()).collect(),
            chunks: shape.clone(),
            shape,
            dtype,
            fill_value: None,
            attrs: Attrs::new(),
            values: None,
        }
    }

    /// Create a 0-D variable.
    pub fn scalar(name: impl Into<String>, dtype: DataType, value: f64) -> Self {
        Self::new::<&str>(name, dtype, &[], Vec::new()).with_values(vec![value])
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<u64>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.values = Some(Values::Loaded(values));
        self
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> u64 {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// True when the dimensions are exactly `dims`, in order.
    pub fn dims_are(&self, dims: &[&str]) -> bool {
        self.dims.len() == dims.len() && self.dims.iter().zip(dims).all(|(a, b)| a == b)
    }

    /// True for a 1-D variable indexed by a dimension of the same name.
    pub fn is_dimension_coord(&self) -> bool {
        self.dims_are(&[self.name.as_str()])
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn loaded_values(&self) -> Option<&[f64]> {
        self.values.as_ref().and_then(Values::as_slice)
    }
}

/// In-memory multi-dimensional labeled array collection.
///
/// Holds only metadata plus the values that were explicitly requested or
/// generated; variable data is otherwise left in storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub attrs: Attrs,
    pub variables: BTreeMap<String, Variable>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Insert or replace a variable.
    pub fn insert(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        self.attrs.get(name).and_then(Value::as_f64)
    }

    /// Dimension sizes collected from all variables.
    pub fn dims(&self) -> BTreeMap<String, u64> {
        let mut dims = BTreeMap::new();
        for variable in self.variables.values() {
            for (dim, size) in variable.dims.iter().zip(&variable.shape) {
                dims.entry(dim.clone()).or_insert(*size);
            }
        }
        dims
    }

    /// Names of variables referenced by another variable's `bounds` attribute.
    pub fn bounds_names(&self) -> BTreeSet<String> {
        self.variables
            .values()
            .filter_map(|variable| variable.attr_str("bounds"))
            .map(str::to_string)
            .collect()
    }

    /// Data variables: neither dimension coordinates nor bounds, with at least one dimension.
    pub fn data_vars(&self) -> impl Iterator<Item = &Variable> {
        let dims = self.dims();
        let bounds = self.bounds_names();
        self.variables.values().filter(move |variable| {
            variable.ndim() > 0
                && !dims.contains_key(&variable.name)
                && !bounds.contains(&variable.name)
        })
    }

    /// Check that shapes, chunks, values and shared dimensions agree.
    pub fn validate(&self) -> Result<()> {
        let mut sizes: BTreeMap<&str, (u64, &str)> = BTreeMap::new();

        for variable in self.variables.values() {
            if variable.dims.len() != variable.shape.len() {
                return Err(Error::InvalidDataset(format!(
                    "variable '{}' has {} dimension(s) but a shape of rank {}",
                    variable.name,
                    variable.dims.len(),
                    variable.shape.len()
                )));
            }
            if variable.chunks.len() != variable.shape.len() {
                return Err(Error::InvalidDataset(format!(
                    "variable '{}' has chunks of rank {} but a shape of rank {}",
                    variable.name,
                    variable.chunks.len(),
                    variable.shape.len()
                )));
            }
            if let Some(count) = variable.values.as_ref().and_then(Values::len) {
                let expected = variable.len();
                if count as u64 != expected {
                    return Err(Error::InvalidDataset(format!(
                        "variable '{}' holds {count} value(s) but its shape requires {expected}",
                        variable.name
                    )));
                }
            }

            for (dim, size) in variable.dims.iter().zip(&variable.shape) {
                match sizes.get(dim.as_str()) {
                    Some((known, owner)) if known != size => {
                        return Err(Error::InvalidDataset(format!(
                            "dimension '{dim}' has size {known} in variable '{owner}' \
                             but size {size} in variable '{}'",
                            variable.name
                        )));
                    }
                    Some(_) => {}
                    None => {
                        sizes.insert(dim, (*size, &variable.name));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut dataset = Dataset::new();
        dataset.insert(
            Variable::new("lon", DataType::Float64, &["lon"], vec![3])
                .with_attr("bounds", "lon_bnds")
                .with_values(vec![0.5, 1.5, 2.5]),
        );
        dataset.insert(Variable::new(
            "lon_bnds",
            DataType::Float64,
            &["lon", "bnds"],
            vec![3, 2],
        ));
        dataset.insert(Variable::new("var_a", DataType::Float32, &["lon"], vec![3]));
        dataset.insert(Variable::scalar("crs", DataType::Int64, 0.0));
        dataset
    }

    #[test]
    fn data_vars_skip_coords_bounds_and_scalars() {
        let dataset = sample();
        let names: Vec<&str> = dataset.data_vars().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["var_a"]);
    }

    #[test]
    fn validate_rejects_conflicting_dimension_sizes() {
        let mut dataset = sample();
        dataset.insert(Variable::new("var_b", DataType::Float32, &["lon"], vec![4]));
        let err = dataset.validate().unwrap_err();
        assert!(err.to_string().contains("dimension 'lon'"));
    }

    #[test]
    fn validate_rejects_value_count_mismatch() {
        let mut dataset = sample();
        dataset.insert(
            Variable::new("lat", DataType::Float64, &["lat"], vec![2]).with_values(vec![1.0]),
        );
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn exact_values_compare_as_integers() {
        let base = 1_700_000_000_000_000_000i64;
        let close = Values::Exact(vec![Some(base), Some(base + 1)]);
        assert!(close.is_strictly_increasing());
        // Both round to the same f64.
        assert_eq!(base as f64, (base + 1) as f64);

        let with_nat = Values::Exact(vec![Some(base), None, Some(base + 2)]);
        assert!(!with_nat.is_strictly_increasing());
        assert!(!with_nat.is_strictly_decreasing());

        assert!(Values::Loaded(vec![3.0, 2.0, 1.0]).is_strictly_decreasing());
        assert!(!Values::Loaded(vec![1.0, f64::NAN]).is_strictly_increasing());
        assert!(Values::Exact(vec![None]).is_strictly_increasing());
    }
}
