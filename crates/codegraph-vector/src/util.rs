//! Shared helpers: the `DuckDB` array-literal formatter, reused by both the
//! write and search paths. Grounded on `zen-lake::store::vec_to_sql` /
//! `zen-search::vector::vec_to_sql`.

use std::fmt::Write as _;

use crate::error::VectorError;
use crate::store::DIMENSION;

/// Format a float slice as a `DuckDB` array literal: `[0.1, 0.2, ...]`.
#[must_use]
pub fn vec_to_sql(v: &[f32]) -> String {
    let mut s = String::with_capacity(v.len() * 10 + 2);
    s.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        let _ = write!(s, "{x}");
    }
    s.push(']');
    s
}

/// Validates an embedding carries exactly [`DIMENSION`] components.
///
/// # Errors
/// Returns [`VectorError::WrongDimension`] otherwise.
pub fn check_dimension(v: &[f32]) -> Result<(), VectorError> {
    if v.len() != DIMENSION {
        return Err(VectorError::WrongDimension { expected: DIMENSION, got: v.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_bracketed_csv() {
        assert_eq!(vec_to_sql(&[0.1, 0.2]), "[0.1, 0.2]");
    }

    #[test]
    fn rejects_wrong_dimension() {
        let short = vec![0.0_f32; 10];
        assert!(check_dimension(&short).is_err());
    }
}
