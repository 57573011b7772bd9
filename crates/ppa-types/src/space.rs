//! Parameter space declarations and lazy grid enumeration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::configuration::{Configuration, ParameterValue};
use crate::errors::{PpaResult, SpaceError};

/// The domain of a single dimension. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    Integer { low: i64, high: i64 },
    Real { low: f64, high: f64 },
}

impl Domain {
    /// Declaration keyword for this kind ("int" or "num").
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer { .. } => "int",
            Self::Real { .. } => "num",
        }
    }

    /// Number of grid levels, `None` for real domains.
    pub fn levels(&self) -> Option<u128> {
        match self {
            Self::Integer { low, high } => Some((*high as i128 - *low as i128 + 1) as u128),
            Self::Real { .. } => None,
        }
    }

    pub fn contains(&self, value: ParameterValue) -> bool {
        match (self, value) {
            (Self::Integer { low, high }, ParameterValue::Int(v)) => (*low..=*high).contains(&v),
            (Self::Integer { .. }, ParameterValue::Real(_)) => false,
            (Self::Real { low, high }, v) => {
                let v = v.as_f64();
                v.is_finite() && *low <= v && v <= *high
            }
        }
    }
}

/// A single named search dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DimensionDeclaration", into = "DimensionDeclaration")]
pub struct Dimension {
    pub name: String,
    pub domain: Domain,
}

impl Dimension {
    pub fn integer(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Integer { low, high },
        }
    }

    pub fn real(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Real { low, high },
        }
    }

    fn validate(&self) -> Result<(), SpaceError> {
        let ordered = match self.domain {
            Domain::Integer { low, high } => low <= high,
            Domain::Real { low, high } => low.is_finite() && high.is_finite() && low <= high,
        };
        if ordered {
            return Ok(());
        }
        let (lower, upper) = match self.domain {
            Domain::Integer { low, high } => (low.to_string(), high.to_string()),
            Domain::Real { low, high } => (low.to_string(), high.to_string()),
        };
        Err(SpaceError::InvalidBounds {
            name: self.name.clone(),
            lower,
            upper,
        })
    }
}

/// Declared kind of a dimension record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredKind {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "num")]
    Num,
}

/// External declaration record: `{"name", "type", "lb", "ub"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeclaredKind,
    pub lb: ParameterValue,
    pub ub: ParameterValue,
}

fn integral_bound(name: &str, value: ParameterValue) -> Result<i64, SpaceError> {
    match value {
        ParameterValue::Int(v) => Ok(v),
        ParameterValue::Real(v)
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 =>
        {
            Ok(v as i64)
        }
        ParameterValue::Real(v) => Err(SpaceError::InvalidDeclaration {
            message: format!("integer dimension {name} has non-integral bound {v}"),
        }),
    }
}

impl TryFrom<DimensionDeclaration> for Dimension {
    type Error = SpaceError;

    fn try_from(decl: DimensionDeclaration) -> Result<Self, Self::Error> {
        let dimension = match decl.kind {
            DeclaredKind::Int => {
                let low = integral_bound(&decl.name, decl.lb)?;
                let high = integral_bound(&decl.name, decl.ub)?;
                Dimension::integer(decl.name, low, high)
            }
            DeclaredKind::Num => Dimension::real(decl.name, decl.lb.as_f64(), decl.ub.as_f64()),
        };
        dimension.validate()?;
        Ok(dimension)
    }
}

impl From<Dimension> for DimensionDeclaration {
    fn from(dimension: Dimension) -> Self {
        match dimension.domain {
            Domain::Integer { low, high } => Self {
                name: dimension.name,
                kind: DeclaredKind::Int,
                lb: ParameterValue::Int(low),
                ub: ParameterValue::Int(high),
            },
            Domain::Real { low, high } => Self {
                name: dimension.name,
                kind: DeclaredKind::Num,
                lb: ParameterValue::Real(low),
                ub: ParameterValue::Real(high),
            },
        }
    }
}

/// The full search space: an ordered, immutable list of dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct ParameterSpace {
    dimensions: Vec<Dimension>,
}

impl ParameterSpace {
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, SpaceError> {
        if dimensions.is_empty() {
            return Err(SpaceError::EmptySpace);
        }
        let mut seen = HashSet::new();
        for dimension in &dimensions {
            if !seen.insert(dimension.name.as_str()) {
                return Err(SpaceError::DuplicateName {
                    name: dimension.name.clone(),
                });
            }
            dimension.validate()?;
        }
        Ok(Self { dimensions })
    }

    pub fn builder() -> ParameterSpaceBuilder {
        ParameterSpaceBuilder::default()
    }

    pub fn from_declaration(records: Vec<DimensionDeclaration>) -> Result<Self, SpaceError> {
        let dimensions = records
            .into_iter()
            .map(Dimension::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(dimensions)
    }

    /// Parse a JSON declaration array.
    pub fn from_json(json: &str) -> PpaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> PpaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// The six-knob microarchitecture space of the tinycore target.
    pub fn tinycore() -> Self {
        Self {
            dimensions: vec![
                Dimension::integer("div_algo", 0, 3),
                Dimension::integer("bp_init_guess", 0, 1),
                Dimension::integer("bp_wrong_tol", 0, 16),
                Dimension::integer("cache_setid_width", 1, 5),
                Dimension::integer("cache_line_width", 1, 6),
                Dimension::integer("cache_n_ways", 1, 16),
            ],
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Whether every dimension is integer-valued (i.e. the space is a grid).
    pub fn is_discrete(&self) -> bool {
        self.dimensions
            .iter()
            .all(|d| matches!(d.domain, Domain::Integer { .. }))
    }

    /// Per-dimension `(low, levels)` pairs, first-declared first.
    fn axes(&self) -> Result<Vec<(i64, u64)>, SpaceError> {
        self.dimensions
            .iter()
            .map(|d| match d.domain {
                Domain::Integer { low, .. } => {
                    let levels = d.domain.levels().unwrap_or(0);
                    u64::try_from(levels)
                        .map(|levels| (low, levels))
                        .map_err(|_| SpaceError::GridOverflow)
                }
                Domain::Real { .. } => Err(SpaceError::UnsupportedDimension {
                    name: d.name.clone(),
                    kind: d.domain.kind().to_string(),
                }),
            })
            .collect()
    }

    fn product(axes: &[(i64, u64)]) -> Result<u64, SpaceError> {
        axes.iter()
            .try_fold(1u64, |total, (_, levels)| total.checked_mul(*levels))
            .ok_or(SpaceError::GridOverflow)
    }

    /// Total number of grid points.
    pub fn grid_size(&self) -> Result<u64, SpaceError> {
        Self::product(&self.axes()?)
    }

    /// Map a grid index to its configuration by mixed-radix decomposition.
    /// The last-declared dimension varies fastest.
    pub fn configuration_at(&self, index: u64) -> Result<Configuration, SpaceError> {
        let axes = self.axes()?;
        let grid_size = Self::product(&axes)?;
        if index >= grid_size {
            return Err(SpaceError::IndexOutOfRange { index, grid_size });
        }
        Ok(self.decode(&axes, index))
    }

    fn decode(&self, axes: &[(i64, u64)], index: u64) -> Configuration {
        let mut offsets = vec![0u64; axes.len()];
        let mut rest = index;
        for (slot, (_, levels)) in offsets.iter_mut().zip(axes).rev() {
            *slot = rest % levels;
            rest /= levels;
        }

        let mut config = Configuration::with_capacity(axes.len());
        for ((dimension, (low, _)), offset) in self.dimensions.iter().zip(axes).zip(offsets) {
            // offset < levels, so the sum stays within [low, high]
            let value = (*low as i128 + offset as i128) as i64;
            config.push(dimension.name.clone(), value);
        }
        config
    }

    /// Lazily enumerate the full Cartesian product in nested-loop order.
    ///
    /// Each call returns a fresh iterator over the same sequence.
    pub fn enumerate_all(&self) -> Result<GridIter<'_>, SpaceError> {
        let axes = self.axes()?;
        let size = Self::product(&axes)?;
        Ok(GridIter {
            space: self,
            axes,
            next: 0,
            size,
        })
    }

    /// Check that `config` names every dimension in order, with in-bounds values.
    pub fn validate(&self, config: &Configuration) -> Result<(), SpaceError> {
        if config.len() != self.dimensions.len() {
            return Err(SpaceError::InvalidConfiguration {
                message: format!(
                    "expected {} fields, got {}",
                    self.dimensions.len(),
                    config.len()
                ),
            });
        }
        for (dimension, (name, value)) in self.dimensions.iter().zip(config.iter()) {
            if dimension.name != name {
                return Err(SpaceError::InvalidConfiguration {
                    message: format!("expected field {}, found {}", dimension.name, name),
                });
            }
            if !dimension.domain.contains(value) {
                return Err(SpaceError::InvalidConfiguration {
                    message: format!("{name}={value} is outside {:?}", dimension.domain),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Dimension>> for ParameterSpace {
    type Error = SpaceError;

    fn try_from(dimensions: Vec<Dimension>) -> Result<Self, Self::Error> {
        Self::new(dimensions)
    }
}

impl From<ParameterSpace> for Vec<Dimension> {
    fn from(space: ParameterSpace) -> Self {
        space.dimensions
    }
}

/// Builder for [`ParameterSpace`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ParameterSpaceBuilder {
    dimensions: Vec<Dimension>,
}

impl ParameterSpaceBuilder {
    pub fn int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.dimensions.push(Dimension::integer(name, low, high));
        self
    }

    pub fn real(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.dimensions.push(Dimension::real(name, low, high));
        self
    }

    pub fn build(self) -> Result<ParameterSpace, SpaceError> {
        ParameterSpace::new(self.dimensions)
    }
}

/// Lazy iterator over every grid point of a discrete space.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    space: &'a ParameterSpace,
    axes: Vec<(i64, u64)>,
    next: u64,
    size: u64,
}

impl Iterator for GridIter<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.size {
            return None;
        }
        let config = self.space.decode(&self.axes, self.next);
        self.next += 1;
        Some(config)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.size - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(space: &ParameterSpace) -> Vec<(i64, i64)> {
        space
            .enumerate_all()
            .unwrap()
            .map(|c| {
                let v: Vec<i64> = c.values().map(|v| v.as_int().unwrap()).collect();
                (v[0], v[1])
            })
            .collect()
    }

    #[test]
    fn grid_size_is_product_of_levels() {
        let space = ParameterSpace::builder()
            .int("a", 1, 3)
            .int("b", 10, 11)
            .build()
            .unwrap();
        assert_eq!(space.grid_size(), Ok(6));
        assert_eq!(ParameterSpace::tinycore().grid_size(), Ok(65_280));
    }

    #[test]
    fn enumeration_is_nested_first_dimension_outermost() {
        let space = ParameterSpace::builder()
            .int("a", 0, 1)
            .int("b", 5, 7)
            .build()
            .unwrap();
        assert_eq!(
            pairs(&space),
            vec![(0, 5), (0, 6), (0, 7), (1, 5), (1, 6), (1, 7)]
        );
        // restartable
        assert_eq!(pairs(&space), pairs(&space));
        assert_eq!(space.enumerate_all().unwrap().len(), 6);
    }

    #[test]
    fn configuration_at_matches_enumeration() {
        let space = ParameterSpace::tinycore();
        let from_iter: Vec<Configuration> = space.enumerate_all().unwrap().take(40).collect();
        for (i, config) in from_iter.iter().enumerate() {
            assert_eq!(&space.configuration_at(i as u64).unwrap(), config);
        }
        let last = space.configuration_at(65_279).unwrap();
        assert_eq!(last.key(), "3,1,16,5,6,16");
        assert_eq!(
            space.configuration_at(65_280),
            Err(SpaceError::IndexOutOfRange {
                index: 65_280,
                grid_size: 65_280
            })
        );
    }

    #[test]
    fn real_dimension_is_not_enumerable() {
        let space = ParameterSpace::builder()
            .int("ways", 1, 4)
            .real("vdd", 0.7, 1.1)
            .build()
            .unwrap();
        assert!(!space.is_discrete());
        match space.grid_size() {
            Err(SpaceError::UnsupportedDimension { name, kind }) => {
                assert_eq!(name, "vdd");
                assert_eq!(kind, "num");
            }
            other => panic!("expected UnsupportedDimension, got {other:?}"),
        }
        assert!(space.enumerate_all().is_err());
    }

    #[test]
    fn construction_rejects_bad_declarations() {
        assert_eq!(
            ParameterSpace::builder().int("a", 0, 1).int("a", 0, 2).build(),
            Err(SpaceError::DuplicateName { name: "a".into() })
        );
        assert!(matches!(
            ParameterSpace::builder().int("a", 3, 1).build(),
            Err(SpaceError::InvalidBounds { .. })
        ));
        assert!(matches!(
            ParameterSpace::builder().real("a", 0.0, f64::NAN).build(),
            Err(SpaceError::InvalidBounds { .. })
        ));
        assert_eq!(ParameterSpace::new(vec![]), Err(SpaceError::EmptySpace));
    }

    #[test]
    fn single_level_dimension_is_valid() {
        let space = ParameterSpace::builder().int("fixed", 4, 4).build().unwrap();
        assert_eq!(space.grid_size(), Ok(1));
        assert_eq!(space.configuration_at(0).unwrap().key(), "4");
    }

    #[test]
    fn grid_overflow_is_reported() {
        let space = ParameterSpace::builder()
            .int("a", i64::MIN, i64::MAX)
            .int("b", 0, 1)
            .build()
            .unwrap();
        assert_eq!(space.grid_size(), Err(SpaceError::GridOverflow));
    }

    #[test]
    fn declaration_json_round_trip() {
        let json = r#"[
            {"name": "div_algo", "type": "int", "lb": 0, "ub": 3},
            {"name": "vdd", "type": "num", "lb": 0.7, "ub": 1.1},
            {"name": "ways", "type": "int", "lb": 1.0, "ub": 16.0}
        ]"#;
        let space = ParameterSpace::from_json(json).unwrap();
        assert_eq!(space.len(), 3);
        assert_eq!(space.dimensions()[0].domain, Domain::Integer { low: 0, high: 3 });
        assert_eq!(space.dimensions()[1].domain, Domain::Real { low: 0.7, high: 1.1 });
        assert_eq!(space.dimensions()[2].domain, Domain::Integer { low: 1, high: 16 });

        let encoded = serde_json::to_string(&space).unwrap();
        assert!(encoded.contains(r#""type":"int""#));
        let back = ParameterSpace::from_json(&encoded).unwrap();
        assert_eq!(back, space);
    }

    #[test]
    fn from_declaration_records() {
        let records = vec![
            DimensionDeclaration {
                name: "bp_init_guess".into(),
                kind: DeclaredKind::Int,
                lb: ParameterValue::Int(0),
                ub: ParameterValue::Int(1),
            },
            DimensionDeclaration {
                name: "bp_wrong_tol".into(),
                kind: DeclaredKind::Int,
                lb: ParameterValue::Int(0),
                ub: ParameterValue::Int(16),
            },
        ];
        let space = ParameterSpace::from_declaration(records).unwrap();
        assert_eq!(space.grid_size(), Ok(34));
        assert!(space.dimension("bp_wrong_tol").is_some());
    }

    #[test]
    fn declaration_rejects_fractional_integer_bounds() {
        let json = r#"[{"name": "a", "type": "int", "lb": 0.5, "ub": 3}]"#;
        assert!(ParameterSpace::from_json(json).is_err());
        let dup = r#"[{"name": "a", "type": "int", "lb": 0, "ub": 3},
                      {"name": "a", "type": "int", "lb": 0, "ub": 3}]"#;
        assert!(ParameterSpace::from_json(dup).is_err());
    }

    #[test]
    fn validate_checks_order_kind_and_bounds() {
        let space = ParameterSpace::builder()
            .int("a", 0, 3)
            .real("b", 0.0, 1.0)
            .build()
            .unwrap();
        assert!(space.validate(&Configuration::new().with("a", 2).with("b", 0.5)).is_ok());
        assert!(space.validate(&Configuration::new().with("a", 2).with("b", 1)).is_ok());
        assert!(space.validate(&Configuration::new().with("b", 0.5).with("a", 2)).is_err());
        assert!(space.validate(&Configuration::new().with("a", 4).with("b", 0.5)).is_err());
        assert!(space.validate(&Configuration::new().with("a", 1.0).with("b", 0.5)).is_err());
        assert!(space.validate(&Configuration::new().with("a", 1)).is_err());
    }
}
