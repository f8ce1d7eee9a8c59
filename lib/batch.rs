/// Most bound parameters a single query is allowed to carry.
pub const DEFAULT_MAX_BOUND_PARAMS: usize = 998;

/// Splits identifier batches so every query stays under the bound parameter limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batcher {
    chunk_size: usize,
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BOUND_PARAMS)
    }
}

impl Batcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
    pub fn chunks<'a, T>(&self, items: &'a [T]) -> std::slice::Chunks<'a, T> {
        items.chunks(self.chunk_size)
    }
    /// Splits rows for inserts binding `columns` parameters per row.
    pub fn row_chunks<'a, T>(&self, rows: &'a [T], columns: usize) -> std::slice::Chunks<'a, T> {
        rows.chunks((self.chunk_size / columns.max(1)).max(1))
    }
    /// Runs `query` once per chunk and concatenates the results in chunk order.
    pub fn run<T, R>(&self, items: &[T], mut query: impl FnMut(&[T]) -> eyre::Result<Vec<R>>) -> eyre::Result<Vec<R>> {
        let mut out = Vec::with_capacity(items.len());
        for chunk in self.chunks(items) {
            out.extend(query(chunk)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_respects_chunk_size() -> eyre::Result<()> {
        let batcher = Batcher::new(3);
        let items: Vec<u64> = (0..10).collect();
        let mut sizes = vec![];
        let out = batcher.run(&items, |chunk| {
            sizes.push(chunk.len());
            Ok(chunk.iter().map(|x| x * 2).collect())
        })?;
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        assert_eq!(out, items.iter().map(|x| x * 2).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_row_chunks_count_bound_parameters() {
        let batcher = Batcher::new(10);
        let rows: Vec<u64> = (0..7).collect();
        let sizes: Vec<usize> = batcher.row_chunks(&rows, 3).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let sizes: Vec<usize> = batcher.row_chunks(&rows, 40).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![1; 7]);
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        assert_eq!(Batcher::new(0).chunk_size(), 1);
        assert_eq!(Batcher::default().chunk_size(), DEFAULT_MAX_BOUND_PARAMS);
    }

    #[test]
    fn test_error_stops_batch() {
        let batcher = Batcher::new(2);
        let mut calls = 0;
        let res: eyre::Result<Vec<u64>> = batcher.run(&[1u64, 2, 3, 4], |_| {
            calls += 1;
            eyre::bail!("boom")
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }
}
