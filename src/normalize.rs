//! Row normalization: one host row plus the visible dimension columns becomes
//! an ordered category path and a flow quantity.

use crate::ir::{FieldDescriptor, Row};
use crate::stages::StageCatalog;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub stages: Vec<String>,
    pub value: f64,
}

impl Path {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Rows shorter than two stages contribute no links.
    pub fn has_links(&self) -> bool {
        self.stages.len() >= 2
    }
}

/// Dimensions minus the hidden ones, in query order.
pub fn visible_dimensions<'a>(
    dimensions: &'a [FieldDescriptor],
    hidden: &[String],
) -> Vec<&'a FieldDescriptor> {
    dimensions
        .iter()
        .filter(|dim| !hidden.iter().any(|name| name == &dim.name))
        .collect()
}

pub fn normalize(row: &Row, visible: &[&FieldDescriptor], measure: &FieldDescriptor) -> Path {
    let mut stages = Vec::with_capacity(visible.len());
    for dim in visible {
        let Some(text) = row.get(&dim.name).and_then(|cell| cell.text()) else {
            break;
        };
        stages.push(text);
    }
    Path {
        stages,
        value: measure_value(row, measure),
    }
}

/// Numeric coercion of the measure cell. Null and missing read as zero.
pub fn measure_value(row: &Row, measure: &FieldDescriptor) -> f64 {
    let value = match row.get(&measure.name).map(|cell| &cell.value) {
        None | Some(Value::Null) => return 0.0,
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Some(Value::Bool(flag)) => Some(if *flag { 1.0 } else { 0.0 }),
        Some(_) => None,
    };
    match value {
        Some(value) if value.is_finite() => value,
        _ => {
            warn!(field = %measure.name, "non-numeric measure value, counting as 0");
            0.0
        }
    }
}

/// Number of cells in the row (any field) holding a success label.
pub fn success_count(row: &Row, catalog: &StageCatalog) -> usize {
    row.values()
        .filter_map(|cell| cell.text())
        .filter(|text| catalog.is_success(text))
        .count()
}

/// Row visiting order: ascending success count, ties kept in input order.
pub fn row_order(rows: &[Row], catalog: &StageCatalog) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by_cached_key(|&idx| success_count(&rows[idx], catalog));
    order
}

pub fn normalize_rows(
    rows: &[Row],
    visible: &[&FieldDescriptor],
    measure: &FieldDescriptor,
    catalog: &StageCatalog,
) -> Vec<Path> {
    row_order(rows, catalog)
        .into_iter()
        .map(|idx| normalize(&rows[idx], visible, measure))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldValue;

    fn row(cells: &[(&str, Value)]) -> Row {
        cells
            .iter()
            .map(|(key, value)| (key.to_string(), FieldValue::new(value.clone())))
            .collect()
    }

    fn dims() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("a", "A"),
            FieldDescriptor::new("b", "B"),
            FieldDescriptor::new("c", "C"),
        ]
    }

    #[test]
    fn stops_at_first_null() {
        let dims = dims();
        let visible = visible_dimensions(&dims, &[]);
        let measure = FieldDescriptor::new("n", "N");
        let r = row(&[
            ("a", Value::from("X")),
            ("b", Value::Null),
            ("c", Value::from("Y")),
            ("n", Value::from(3)),
        ]);
        let path = normalize(&r, &visible, &measure);
        assert_eq!(path.stages, vec!["X".to_string()]);
        assert!(!path.has_links());
        assert_eq!(path.value, 3.0);
    }

    #[test]
    fn hidden_dimensions_are_removed_from_the_path() {
        let dims = dims();
        let visible = visible_dimensions(&dims, &["b".to_string()]);
        let measure = FieldDescriptor::new("n", "N");
        let r = row(&[
            ("a", Value::from("X")),
            ("b", Value::from("Mid")),
            ("c", Value::from("Y")),
            ("n", Value::from(1)),
        ]);
        let path = normalize(&r, &visible, &measure);
        assert_eq!(path.stages, vec!["X".to_string(), "Y".to_string()]);
    }

    #[test]
    fn measure_coercion() {
        let measure = FieldDescriptor::new("n", "N");
        assert_eq!(measure_value(&row(&[("n", Value::from("12.5"))]), &measure), 12.5);
        assert_eq!(measure_value(&row(&[("n", Value::Null)]), &measure), 0.0);
        assert_eq!(measure_value(&row(&[]), &measure), 0.0);
        assert_eq!(measure_value(&row(&[("n", Value::from("abc"))]), &measure), 0.0);
    }

    #[test]
    fn rows_are_ordered_by_success_count_stably() {
        let catalog = StageCatalog::default();
        let rows = vec![
            row(&[("a", Value::from("Eligible")), ("b", Value::from("Targeting Matched"))]),
            row(&[("a", Value::from("Ineligible"))]),
            row(&[("a", Value::from("Eligible")), ("b", Value::from("Targeting Unmatched"))]),
            row(&[("a", Value::from("Ineligible")), ("n", Value::from(4))]),
        ];
        assert_eq!(row_order(&rows, &catalog), vec![1, 3, 2, 0]);
    }
}
