//! Reconstruction of reading order from separately captured front and back sides.

/// Front and back batches of different sizes cannot be paired.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Number of even pages ({even}) does not match number of odd pages ({odd})")]
pub struct InterleaveError {
    /// Odd page count.
    pub odd: usize,
    /// Even page count.
    pub even: usize,
}

/// Merge `[o0, o1, ..]` and `[e0, e1, ..]` into `[o0, e0, o1, e1, ..]`.
///
/// Both batches must be in ascending page order and of equal length.
///
/// ```
/// use batchscan::session::interleave;
///
/// let pages = interleave(&[1, 3, 5], &[2, 4, 6]).unwrap();
/// assert_eq!(pages, vec![1, 2, 3, 4, 5, 6]);
/// assert!(interleave(&[1, 3], &[2]).is_err());
/// ```
pub fn interleave<T: Clone>(odd: &[T], even: &[T]) -> Result<Vec<T>, InterleaveError> {
    if odd.len() != even.len() {
        return Err(InterleaveError {
            odd: odd.len(),
            even: even.len(),
        });
    }

    let mut pages = Vec::with_capacity(odd.len() * 2);
    for (front, back) in odd.iter().zip(even) {
        pages.push(front.clone());
        pages.push(back.clone());
    }
    Ok(pages)
}
