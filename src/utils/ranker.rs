//! Dense ranking for leaderboards

/// Pair each item of a score-ordered sequence with its rank
///
/// Equal consecutive scores share a rank; the next distinct score gets the
/// next integer, starting from 1.
pub fn ranker<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<(usize, T)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut rank = 0;
    let mut last: Option<K> = None;

    items
        .into_iter()
        .map(|item| {
            let score = key(&item);
            if last.as_ref() != Some(&score) {
                rank += 1;
                last = Some(score);
            }
            (rank, item)
        })
        .collect()
}
