//! Satisfaction rating prompt

/// Star rating shown when a session ends
///
/// Selecting level N marks levels 1..=N as chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingPrompt {
    levels: u8,
    chosen: u8,
}

impl RatingPrompt {
    /// Create a prompt with `levels` selectable levels, none chosen
    pub fn new(levels: u8) -> Self {
        Self { levels, chosen: 0 }
    }

    /// Number of selectable levels
    pub fn levels(&self) -> u8 {
        self.levels
    }

    /// Number of levels currently marked
    pub fn chosen(&self) -> u8 {
        self.chosen
    }

    /// Select a level; out-of-range levels are ignored
    ///
    /// Returns the number of chosen levels after the selection.
    pub fn select(&mut self, level: u8) -> u8 {
        if (1..=self.levels).contains(&level) {
            self.chosen = level;
        }
        self.chosen
    }

    /// Submit the rating, `None` while nothing is chosen
    pub fn submit(&self) -> Option<u8> {
        (self.chosen > 0).then_some(self.chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_marks_lower_levels() {
        let mut prompt = RatingPrompt::new(5);
        assert_eq!(prompt.select(3), 3);
        assert_eq!(prompt.select(1), 1);
        assert_eq!(prompt.select(5), 5);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut prompt = RatingPrompt::new(5);
        prompt.select(2);
        assert_eq!(prompt.select(0), 2);
        assert_eq!(prompt.select(6), 2);
    }

    #[test]
    fn test_submit_requires_selection() {
        let mut prompt = RatingPrompt::new(5);
        assert_eq!(prompt.submit(), None);
        prompt.select(4);
        assert_eq!(prompt.submit(), Some(4));
    }
}
