use core::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Role an attribute plays on a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrRole {
    /// Horizontal position.
    X,
    /// Vertical position.
    Y,
    /// Splits the plot into columns of sub-plots.
    TopSplit,
    /// Splits the plot into rows of sub-plots.
    RightSplit,
    /// Drives point color.
    Legend,
}

/// Observed type of an attribute's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    Numeric,
    Categorical,
    Date,
    Qualitative,
    Color,
}

/// Identifies one sub-plot region of a faceted graph by the category values
/// of the top and right split attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellKey {
    pub top: Option<String>,
    pub right: Option<String>,
}

impl CellKey {
    pub fn new(top: Option<&str>, right: Option<&str>) -> Self {
        Self {
            top: top.map(str::to_owned),
            right: right.map(str::to_owned),
        }
    }

    /// Canonical string form, used to key per-cell maps so entries remain
    /// stable across snapshots.
    pub fn canonical(&self) -> String {
        match (&self.top, &self.right) {
            (None, None) => "{}".to_owned(),
            (Some(t), None) => format!("{{top:{t}}}"),
            (None, Some(r)) => format!("{{right:{r}}}"),
            (Some(t), Some(r)) => format!("{{top:{t};right:{r}}}"),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// One case's value for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseValue {
    Numeric(f64),
    Category(String),
}

impl CaseValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Category(s) => Some(s),
        }
    }
}

/// The document layer's view of the data, as consumed by the graph core.
///
/// Implementations own attribute assignment, filtering, and category
/// derivation; the graph core only reads through this interface.
pub trait DataConfiguration {
    /// Observed type of the attribute assigned to `role`, if any.
    fn attribute_type(&self, role: AttrRole) -> Option<AttributeType>;

    /// Identifier of the attribute assigned to `role`, if any.
    fn attribute_id(&self, role: AttrRole) -> Option<String>;

    /// Number of plottable cases.
    fn case_count(&self) -> usize;

    /// Numeric values of all plottable cases for `role`, in case order.
    /// Cases without a numeric value for the role are omitted.
    fn sub_plot_cases(&self, role: AttrRole) -> Vec<f64>;

    /// Distinct category values for `role`, in first-appearance order.
    fn categories(&self, role: AttrRole) -> Vec<String>;

    /// Number of cases falling in the given sub-plot cell.
    fn cell_case_count(&self, cell: &CellKey) -> usize;

    /// Numeric values for `role` among the cases in the given cell.
    fn cell_numeric_values(&self, role: AttrRole, cell: &CellKey) -> Vec<f64>;

    /// Paired finite (x, y) values among the cases in the given cell.
    fn cell_paired_values(&self, cell: &CellKey) -> Vec<(f64, f64)>;

    /// Every currently-visible sub-plot cell, row-major: right-split
    /// categories are rows, top-split categories are columns. A graph with
    /// no split attributes has exactly one cell with empty keys.
    fn cell_keys(&self) -> Vec<CellKey> {
        let columns = self.categories(AttrRole::TopSplit);
        let rows = self.categories(AttrRole::RightSplit);
        let columns: Vec<Option<&str>> = if columns.is_empty() {
            vec![None]
        } else {
            columns.iter().map(|c| Some(c.as_str())).collect()
        };
        let rows: Vec<Option<&str>> = if rows.is_empty() {
            vec![None]
        } else {
            rows.iter().map(|c| Some(c.as_str())).collect()
        };
        let mut keys = Vec::with_capacity(rows.len() * columns.len());
        for row in &rows {
            for column in &columns {
                keys.push(CellKey::new(*column, *row));
            }
        }
        keys
    }
}

/// Description of one attribute assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrDesc {
    pub id: String,
    pub attr_type: AttributeType,
}

/// A plain in-memory [`DataConfiguration`].
///
/// Used by the test suites and by embedders without their own document
/// layer. Cases are stored as per-role value maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDataConfig {
    attrs: IndexMap<AttrRole, AttrDesc>,
    cases: Vec<IndexMap<AttrRole, CaseValue>>,
}

impl MemoryDataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an attribute to a role.
    pub fn with_attribute(
        mut self,
        role: AttrRole,
        id: impl Into<String>,
        attr_type: AttributeType,
    ) -> Self {
        self.attrs.insert(
            role,
            AttrDesc {
                id: id.into(),
                attr_type,
            },
        );
        self
    }

    /// Remove the attribute assigned to a role, along with its case values.
    pub fn remove_attribute(&mut self, role: AttrRole) {
        self.attrs.shift_remove(&role);
        for case in &mut self.cases {
            case.shift_remove(&role);
        }
    }

    /// Change the observed type of the attribute assigned to a role.
    pub fn set_attribute_type(&mut self, role: AttrRole, attr_type: AttributeType) {
        if let Some(desc) = self.attrs.get_mut(&role) {
            desc.attr_type = attr_type;
        }
    }

    /// Append one case.
    pub fn push_case<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (AttrRole, CaseValue)>,
    {
        self.cases.push(values.into_iter().collect());
    }

    /// Remove all cases, keeping attribute assignments.
    pub fn clear_cases(&mut self) {
        self.cases.clear();
    }

    fn case_in_cell(case: &IndexMap<AttrRole, CaseValue>, cell: &CellKey) -> bool {
        let top_matches = match &cell.top {
            None => true,
            Some(cat) => case
                .get(&AttrRole::TopSplit)
                .and_then(CaseValue::as_category)
                .is_some_and(|c| c == cat),
        };
        let right_matches = match &cell.right {
            None => true,
            Some(cat) => case
                .get(&AttrRole::RightSplit)
                .and_then(CaseValue::as_category)
                .is_some_and(|c| c == cat),
        };
        top_matches && right_matches
    }
}

impl DataConfiguration for MemoryDataConfig {
    fn attribute_type(&self, role: AttrRole) -> Option<AttributeType> {
        self.attrs.get(&role).map(|d| d.attr_type)
    }

    fn attribute_id(&self, role: AttrRole) -> Option<String> {
        self.attrs.get(&role).map(|d| d.id.clone())
    }

    fn case_count(&self) -> usize {
        self.cases.len()
    }

    fn sub_plot_cases(&self, role: AttrRole) -> Vec<f64> {
        self.cases
            .iter()
            .filter_map(|case| case.get(&role).and_then(CaseValue::as_f64))
            .collect()
    }

    fn categories(&self, role: AttrRole) -> Vec<String> {
        if self.attrs.get(&role).is_none() {
            return Vec::new();
        }
        let mut seen = IndexSet::new();
        for case in &self.cases {
            if let Some(cat) = case.get(&role).and_then(CaseValue::as_category) {
                seen.insert(cat.to_owned());
            }
        }
        seen.into_iter().collect()
    }

    fn cell_case_count(&self, cell: &CellKey) -> usize {
        self.cases
            .iter()
            .filter(|case| Self::case_in_cell(case, cell))
            .count()
    }

    fn cell_numeric_values(&self, role: AttrRole, cell: &CellKey) -> Vec<f64> {
        self.cases
            .iter()
            .filter(|case| Self::case_in_cell(case, cell))
            .filter_map(|case| case.get(&role).and_then(CaseValue::as_f64))
            .collect()
    }

    fn cell_paired_values(&self, cell: &CellKey) -> Vec<(f64, f64)> {
        self.cases
            .iter()
            .filter(|case| Self::case_in_cell(case, cell))
            .filter_map(|case| {
                let x = case.get(&AttrRole::X).and_then(CaseValue::as_f64)?;
                let y = case.get(&AttrRole::Y).and_then(CaseValue::as_f64)?;
                (x.is_finite() && y.is_finite()).then_some((x, y))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_config() -> MemoryDataConfig {
        let mut data = MemoryDataConfig::new()
            .with_attribute(AttrRole::X, "height", AttributeType::Numeric)
            .with_attribute(AttrRole::TopSplit, "sex", AttributeType::Categorical)
            .with_attribute(AttrRole::RightSplit, "habitat", AttributeType::Categorical);
        for (height, sex, habitat) in [
            (10.0, "m", "land"),
            (12.0, "f", "land"),
            (9.0, "m", "water"),
            (11.5, "f", "land"),
        ] {
            data.push_case([
                (AttrRole::X, CaseValue::Numeric(height)),
                (AttrRole::TopSplit, CaseValue::Category(sex.into())),
                (AttrRole::RightSplit, CaseValue::Category(habitat.into())),
            ]);
        }
        data
    }

    #[test]
    fn categories_preserve_first_appearance_order() {
        let data = split_config();
        assert_eq!(data.categories(AttrRole::TopSplit), vec!["m", "f"]);
        assert_eq!(data.categories(AttrRole::RightSplit), vec!["land", "water"]);
        assert!(data.categories(AttrRole::Legend).is_empty());
    }

    #[test]
    fn cell_keys_enumerate_rows_by_columns() {
        let data = split_config();
        let keys = data.cell_keys();
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0], CellKey::new(Some("m"), Some("land")));
        assert_eq!(keys[1], CellKey::new(Some("f"), Some("land")));
        assert_eq!(keys[2], CellKey::new(Some("m"), Some("water")));
        assert_eq!(keys[3], CellKey::new(Some("f"), Some("water")));
    }

    #[test]
    fn unsplit_graph_has_one_cell() {
        let data = MemoryDataConfig::new().with_attribute(AttrRole::X, "v", AttributeType::Numeric);
        assert_eq!(data.cell_keys(), vec![CellKey::default()]);
    }

    #[test]
    fn cell_filtering_matches_both_splits() {
        let data = split_config();
        let cell = CellKey::new(Some("f"), Some("land"));
        assert_eq!(data.cell_case_count(&cell), 2);
        assert_eq!(data.cell_numeric_values(AttrRole::X, &cell), vec![12.0, 11.5]);
        let empty = CellKey::new(Some("f"), Some("water"));
        assert_eq!(data.cell_case_count(&empty), 0);
    }

    #[test]
    fn canonical_cell_keys_are_stable() {
        assert_eq!(CellKey::default().canonical(), "{}");
        assert_eq!(CellKey::new(Some("a"), None).canonical(), "{top:a}");
        assert_eq!(
            CellKey::new(Some("a"), Some("b")).canonical(),
            "{top:a;right:b}"
        );
    }

    #[test]
    fn paired_values_skip_incomplete_cases() {
        let mut data = MemoryDataConfig::new()
            .with_attribute(AttrRole::X, "x", AttributeType::Numeric)
            .with_attribute(AttrRole::Y, "y", AttributeType::Numeric);
        data.push_case([
            (AttrRole::X, CaseValue::Numeric(1.0)),
            (AttrRole::Y, CaseValue::Numeric(2.0)),
        ]);
        data.push_case([(AttrRole::X, CaseValue::Numeric(3.0))]);
        data.push_case([
            (AttrRole::X, CaseValue::Numeric(f64::NAN)),
            (AttrRole::Y, CaseValue::Numeric(4.0)),
        ]);
        assert_eq!(data.cell_paired_values(&CellKey::default()), vec![(1.0, 2.0)]);
    }
}
