use insight_protocol::{FilterField, SelectedFilters};

/// One field's choice in a selection control.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// No constraint on this field.
    #[default]
    All,
    Value(String),
}

impl Selection {
    /// Empty text is the same as `All`.
    pub fn value(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Selection::All
        } else {
            Selection::Value(value)
        }
    }
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selected: SelectedFilters,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update exactly one field; every other field keeps its choice.
    pub fn set(&mut self, field: FilterField, selection: Selection) {
        match selection {
            Selection::All => {
                self.selected.clear(field);
            }
            Selection::Value(value) => self.selected.set(field, value),
        }
    }

    pub fn get(&self, field: FilterField) -> Selection {
        self.selected
            .get(field)
            .map(Selection::value)
            .unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.selected.clear_all();
    }

    /// The wire form: only constrained fields.
    pub fn selected(&self) -> &SelectedFilters {
        &self.selected
    }
}

impl From<SelectedFilters> for FilterState {
    fn from(selected: SelectedFilters) -> Self {
        Self { selected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_touches_only_the_named_field() {
        let mut state = FilterState::new();
        state.set(FilterField::Sector, Selection::value("Energy"));
        state.set(FilterField::Region, Selection::value("World"));
        state.set(FilterField::Sector, Selection::All);
        assert_eq!(state.get(FilterField::Sector), Selection::All);
        assert_eq!(
            state.get(FilterField::Region),
            Selection::Value("World".into())
        );
        assert_eq!(state.selected().len(), 1);
    }

    #[test]
    fn literal_all_is_an_ordinary_value() {
        let mut state = FilterState::new();
        state.set(FilterField::Topic, Selection::value("all"));
        assert_eq!(state.selected().get(FilterField::Topic), Some("all"));
    }

    #[test]
    fn empty_value_means_unconstrained() {
        assert_eq!(Selection::value(""), Selection::All);
        let mut state = FilterState::new();
        state.set(FilterField::City, Selection::Value(String::new()));
        assert!(state.selected().is_empty());
    }

    #[test]
    fn reset_clears_every_field() {
        let mut state = FilterState::new();
        for field in FilterField::ALL {
            state.set(field, Selection::value("x"));
        }
        state.reset();
        assert!(state.selected().is_empty());
    }
}
