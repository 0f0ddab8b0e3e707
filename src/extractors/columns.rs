//! Column layout for multi-dimension templates.
//!
//! Some templates report two measures per row (for example two stress
//! scenario measures, each for two periods). The number of numeric columns is
//! learned from the first row that yields values, since header-adjacent rows
//! are the most reliable, and then applied to every later row.

use crate::catalog::Dimension;

/// State of a [`DimensionSplitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterState {
    /// No row has produced values yet
    Calibrating,
    /// Column count learned from the first row
    Steady {
        /// Numeric columns per row
        columns: usize,
    },
}

/// Assigns the numeric values of a row to the template's dimensions.
#[derive(Debug, Clone)]
pub struct DimensionSplitter {
    dimensions: Vec<Dimension>,
    state: SplitterState,
}

impl DimensionSplitter {
    /// Create a splitter for the given dimensions, in column order.
    pub fn new(dimensions: &[Dimension]) -> Self {
        Self {
            dimensions: dimensions.to_vec(),
            state: SplitterState::Calibrating,
        }
    }

    /// Current state.
    pub fn state(&self) -> SplitterState {
        self.state
    }

    /// Split one row's values into `(dimension, value)` pairs.
    ///
    /// Each dimension owns an equal group of columns and reads the first
    /// column of its group (the current period). A row with fewer values than
    /// the learned layout is split over the values it has. `only` restricts
    /// the output to a single dimension.
    pub fn split<T: Clone>(&mut self, values: &[T], only: Option<Dimension>) -> Vec<(Dimension, T)> {
        if values.is_empty() || self.dimensions.is_empty() {
            return Vec::new();
        }

        let columns = match self.state {
            SplitterState::Calibrating => {
                log::debug!("Dimension layout calibrated at {} columns", values.len());
                self.state = SplitterState::Steady {
                    columns: values.len(),
                };
                values.len()
            },
            SplitterState::Steady { columns } => columns.min(values.len()),
        };

        let group = (columns / self.dimensions.len()).max(1);
        self.dimensions
            .iter()
            .enumerate()
            .filter(|(_, dim)| only.map_or(true, |o| o == **dim))
            .filter_map(|(k, dim)| {
                let position = k * group;
                (position < columns).then(|| (*dim, values[position].clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: [Dimension; 2] = [Dimension::Primary, Dimension::Secondary];

    #[test]
    fn test_calibrates_on_first_row() {
        let mut splitter = DimensionSplitter::new(&DIMS);
        assert_eq!(splitter.state(), SplitterState::Calibrating);

        let split = splitter.split(&["-120", "-95", "-40", "-31"], None);
        assert_eq!(split, vec![(Dimension::Primary, "-120"), (Dimension::Secondary, "-40")]);
        assert_eq!(splitter.state(), SplitterState::Steady { columns: 4 });

        // Steady state keeps the learned layout
        let split = splitter.split(&["10", "11", "12", "13", "14"], None);
        assert_eq!(split, vec![(Dimension::Primary, "10"), (Dimension::Secondary, "12")]);
    }

    #[test]
    fn test_short_row_and_restriction() {
        let mut splitter = DimensionSplitter::new(&DIMS);
        splitter.split(&[1, 2, 3, 4], None);
        assert_eq!(splitter.split(&[7, 8], None), vec![(Dimension::Primary, 7), (Dimension::Secondary, 8)]);
        assert_eq!(splitter.split(&[7, 8], Some(Dimension::Primary)), vec![(Dimension::Primary, 7)]);
    }

    #[test]
    fn test_single_column_feeds_primary_only() {
        let mut splitter = DimensionSplitter::new(&DIMS);
        assert_eq!(splitter.split(&[5], None), vec![(Dimension::Primary, 5)]);
    }
}
