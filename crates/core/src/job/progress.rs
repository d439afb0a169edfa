//! Progress estimation from the packaging tool's output.
//!
//! Best effort only: the tool makes no promise about its wording.

/// Substring milestones, checked in order.
const MILESTONES: [(&str, u8); 3] = [("Analyzing", 30), ("Collecting", 50), ("Building", 70)];

/// Completion marker, matched case-insensitively.
const COMPLETION_MARKER: &str = "completed successfully";

/// Percentage a single output line suggests, if any.
pub fn estimate(line: &str) -> Option<u8> {
    if line.to_lowercase().contains(COMPLETION_MARKER) {
        return Some(100);
    }
    MILESTONES
        .iter()
        .find(|(marker, _)| line.contains(marker))
        .map(|(_, percent)| *percent)
}

/// Monotonic progress ratchet in `0..=100`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressTracker {
    current: u8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    /// Feeds one output line. Returns the new value if progress went up.
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        estimate(line).and_then(|percent| self.raise(percent))
    }

    /// Raises progress to `percent`. Lower values are ignored.
    pub fn raise(&mut self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        if percent > self.current {
            self.current = percent;
            Some(percent)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        assert_eq!(estimate("123 INFO: Analyzing base_library.zip"), Some(30));
        assert_eq!(estimate("Collecting submodules"), Some(50));
        assert_eq!(estimate("INFO: Building PYZ"), Some(70));
        assert_eq!(estimate("Build COMPLETED SUCCESSFULLY."), Some(100));
        assert_eq!(estimate("INFO: PyInstaller: 6.3.0"), None);
        // Case-sensitive milestones
        assert_eq!(estimate("analyzing"), None);
    }

    #[test]
    fn test_completion_wins_over_milestone() {
        assert_eq!(
            estimate("INFO: Building EXE from EXE-00.toc completed successfully."),
            Some(100)
        );
    }

    #[test]
    fn test_ratchet_never_decreases() {
        let mut tracker = ProgressTracker::new();
        let lines = [
            "Analyzing app.py",
            "Building PYZ",
            "Analyzing hooks",
            "Collecting data",
            "noise",
            "Building EXE",
        ];

        let mut seen = vec![];
        for line in lines {
            tracker.observe(line);
            seen.push(tracker.current());
        }
        assert_eq!(seen, vec![30, 70, 70, 70, 70, 70]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_observe_reports_only_increases() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.observe("Collecting"), Some(50));
        assert_eq!(tracker.observe("Collecting"), None);
        assert_eq!(tracker.observe("Analyzing"), None);
        assert_eq!(tracker.raise(100), Some(100));
        assert_eq!(tracker.raise(200), None);
        assert_eq!(tracker.current(), 100);
    }
}
