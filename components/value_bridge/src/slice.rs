//! Slice range resolution for byte-buffer views.
//!
//! Ranges are half-open and clamped. A negative index counts from the end
//! (`len + i`), with no inclusive-end adjustment: `slice(b, 0, -1)` excludes
//! the final element, exactly as a Python slice would.

/// Resolves `(start, end)` against a container of `len` elements.
///
/// `end = None` means "to the end". The result always satisfies
/// `start <= end <= len`, so it can index a slice directly.
///
/// # Examples
///
/// ```
/// use value_bridge::resolve_slice;
///
/// assert_eq!(resolve_slice(5, 1, Some(3)), (1, 3));
/// assert_eq!(resolve_slice(5, -2, None), (3, 5));
/// assert_eq!(resolve_slice(5, 0, Some(-1)), (0, 4));
/// assert_eq!(resolve_slice(5, 4, Some(2)), (4, 4)); // empty, not reversed
/// ```
pub fn resolve_slice(len: usize, start: i64, end: Option<i64>) -> (usize, usize) {
    let clamp = |index: i64| -> usize {
        let resolved = if index < 0 { index + len as i64 } else { index };
        resolved.clamp(0, len as i64) as usize
    };
    let start = clamp(start);
    let end = end.map(clamp).unwrap_or(len);
    (start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_range_is_half_open() {
        assert_eq!(resolve_slice(5, 1, Some(3)), (1, 3));
        assert_eq!(resolve_slice(5, 0, Some(5)), (0, 5));
    }

    #[test]
    fn negative_start_counts_from_the_end() {
        assert_eq!(resolve_slice(5, -2, None), (3, 5));
        assert_eq!(resolve_slice(5, -10, None), (0, 5));
    }

    #[test]
    fn negative_end_excludes_the_final_element() {
        // The contested branch: no +1 is applied for negative ends.
        assert_eq!(resolve_slice(5, 0, Some(-1)), (0, 4));
        assert_eq!(resolve_slice(5, 0, Some(-5)), (0, 0));
        assert_eq!(resolve_slice(5, 0, Some(-6)), (0, 0));
    }

    #[test]
    fn crossed_range_collapses_to_empty() {
        assert_eq!(resolve_slice(5, 4, Some(2)), (4, 4));
        assert_eq!(resolve_slice(5, -1, Some(1)), (4, 4));
    }

    #[test]
    fn out_of_range_indices_clamp() {
        assert_eq!(resolve_slice(3, 0, Some(99)), (0, 3));
        assert_eq!(resolve_slice(0, -1, Some(1)), (0, 0));
    }
}
