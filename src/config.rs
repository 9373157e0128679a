use crate::handle::{ITEM_BITS, MAX_PAGES};

/// How a query that is don't-care at a decision variable descends the index tree.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Traversal {
    /// Visit only the don't-care branch. May miss overlaps with cubes stored under the
    /// concrete branches.
    #[default]
    Fast,
    /// Visit all three branches.
    Exact,
}

/// How the index checks a candidate once it has become a tree.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum TreeCheck {
    /// Collect every overlapping cube with one DFS, then compare against the collected sets.
    #[default]
    Collect,
    /// Scan each reachable bucket in turn.
    Recursive,
}

/// Parameters of one exploration run.
#[derive(Debug, Clone)]
pub struct EraConfig {
    /// Stop once more than this many cubes were created.
    pub max_cubes: usize,
    /// Watch the outputs and stop at the first one asserted.
    pub stop_on_bad: bool,
    /// Report progress at `info` level.
    pub verbose: bool,
    /// Expanded states between progress reports.
    pub report_interval: usize,
    /// Enumerator calls allowed per expanded state.
    pub max_calls: u64,
    /// Bucket size that triggers a compress or split.
    pub bucket_limit: u8,
    /// log2 of the number of items per arena page.
    pub page_bits: u32,
    /// Page ceiling per record kind.
    pub max_pages: usize,
    pub traversal: Traversal,
    pub tree_check: TreeCheck,
    /// Scratch graph size that triggers recycling.
    pub scratch_limit: usize,
}

impl Default for EraConfig {
    fn default() -> Self {
        Self {
            max_cubes: usize::MAX,
            stop_on_bad: true,
            verbose: false,
            report_interval: 5000,
            max_calls: 1_000_000,
            bucket_limit: 63,
            page_bits: ITEM_BITS,
            max_pages: MAX_PAGES as usize,
            traversal: Traversal::Fast,
            tree_check: TreeCheck::Collect,
            scratch_limit: 1_000_000,
        }
    }
}

impl EraConfig {
    pub fn with_max_cubes(mut self, max_cubes: usize) -> Self {
        self.max_cubes = max_cubes;
        self
    }

    pub fn with_stop_on_bad(mut self, stop_on_bad: bool) -> Self {
        self.stop_on_bad = stop_on_bad;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_report_interval(mut self, report_interval: usize) -> Self {
        self.report_interval = report_interval.max(1);
        self
    }

    pub fn with_max_calls(mut self, max_calls: u64) -> Self {
        self.max_calls = max_calls;
        self
    }

    pub fn with_bucket_limit(mut self, bucket_limit: u8) -> Self {
        assert!(bucket_limit >= 2, "Bucket limit should be at least 2");
        self.bucket_limit = bucket_limit;
        self
    }

    pub fn with_pages(mut self, page_bits: u32, max_pages: usize) -> Self {
        self.page_bits = page_bits;
        self.max_pages = max_pages;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_tree_check(mut self, tree_check: TreeCheck) -> Self {
        self.tree_check = tree_check;
        self
    }

    pub fn with_scratch_limit(mut self, scratch_limit: usize) -> Self {
        self.scratch_limit = scratch_limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EraConfig::default();
        assert_eq!(config.bucket_limit, 63);
        assert_eq!(config.max_calls, 1_000_000);
        assert_eq!(config.page_bits, 20);
        assert_eq!(config.max_pages, 2048);
        assert_eq!(config.traversal, Traversal::Fast);
        assert!(config.stop_on_bad);
    }

    #[test]
    fn test_builders() {
        let config = EraConfig::default()
            .with_max_cubes(10)
            .with_traversal(Traversal::Exact)
            .with_pages(4, 8)
            .with_report_interval(0);
        assert_eq!(config.max_cubes, 10);
        assert_eq!(config.traversal, Traversal::Exact);
        assert_eq!((config.page_bits, config.max_pages), (4, 8));
        assert_eq!(config.report_interval, 1);
    }
}
