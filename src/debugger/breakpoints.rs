use std::collections::HashSet;
use tracing::debug;

/// Original source lines whose logged states are flagged in reports.
#[derive(Debug, Default, Clone)]
pub struct Breakpoints {
    points: HashSet<usize>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self {
            points: HashSet::new(),
        }
    }

    pub fn add(&mut self, source_line: usize) {
        self.points.insert(source_line);
        debug!(line = source_line, "breakpoint set");
    }

    pub fn contains(&self, source_line: usize) -> bool {
        self.points.contains(&source_line)
    }
}

impl FromIterator<usize> for Breakpoints {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bps = Breakpoints::new();
        for line in iter {
            bps.add(line);
        }
        bps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_lines() {
        let bps: Breakpoints = [3, 7, 3].into_iter().collect();
        assert!(bps.contains(3));
        assert!(bps.contains(7));
        assert!(!bps.contains(4));
        assert!(!Breakpoints::new().contains(3));
    }
}
