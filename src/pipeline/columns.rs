//! Typed access to polars columns
//!
//! Stages read columns as plain vectors of optional values and write new
//! columns back. NaN in a float column is treated the same as null.

use polars::prelude::*;

use super::error::PipelineResult;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub fn is_numeric(col: &Column) -> bool {
    col.dtype().is_primitive_numeric()
}

/// Column values as `f64`, with null and NaN mapped to `None`.
pub fn float_values(col: &Column) -> PipelineResult<Vec<Option<f64>>> {
    let cast = col.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Column values rendered as strings, with null (and NaN) mapped to `None`.
///
/// Integral floats render without a fractional part so `3.0` and `3`
/// produce the same level.
pub fn string_values(col: &Column) -> PipelineResult<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Boolean => col
            .bool()?
            .iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        dt if dt.is_primitive_numeric() => float_values(col)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect(),
        _ => {
            // For other types, try to cast to string
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// `true` for every null (or NaN) cell.
pub fn missing_mask(col: &Column) -> PipelineResult<Vec<bool>> {
    if col.dtype().is_float() {
        Ok(float_values(col)?.iter().map(Option::is_none).collect())
    } else {
        Ok(col.is_null().iter().map(|v| v.unwrap_or(true)).collect())
    }
}

pub fn format_number(v: f64) -> String {
    format!("{}", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_values_maps_nan_to_none() {
        let col = Column::new("x".into(), [Some(1.0f64), None, Some(f64::NAN)]);
        assert_eq!(float_values(&col).unwrap(), vec![Some(1.0), None, None]);
    }

    #[test]
    fn test_float_values_casts_integers() {
        let col = Column::new("x".into(), [1i32, 2, 3]);
        assert_eq!(
            float_values(&col).unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn test_string_values_for_numbers() {
        let col = Column::new("pclass".into(), [Some(1i64), None, Some(3)]);
        assert_eq!(
            string_values(&col).unwrap(),
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[test]
    fn test_missing_mask() {
        let text = Column::new("s".into(), [Some("a"), None]);
        assert_eq!(missing_mask(&text).unwrap(), vec![false, true]);

        let float = Column::new("f".into(), [f64::NAN, 1.0]);
        assert_eq!(missing_mask(&float).unwrap(), vec![true, false]);
    }

    #[test]
    fn test_has_column() {
        let df = df! { "a" => [1i32] }.unwrap();
        assert!(has_column(&df, "a"));
        assert!(!has_column(&df, "b"));
    }
}
