use gtfs::RouteID;

/// The routes a user has picked to look at together, in the order they were picked. Like
/// clicking entries in a map legend, selecting a route twice turns it off again.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteSelection(Vec<RouteID>);

impl RouteSelection {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Duplicates are dropped, keeping the first position.
    pub fn from_ids<I: IntoIterator<Item = RouteID>>(ids: I) -> Self {
        let mut selection = Self::new();
        for id in ids {
            if !selection.contains(&id) {
                selection.0.push(id);
            }
        }
        selection
    }

    /// Returns true if the route is selected afterwards.
    pub fn toggle(&mut self, id: RouteID) -> bool {
        if let Some(idx) = self.0.iter().position(|x| x == &id) {
            self.0.remove(idx);
            false
        } else {
            self.0.push(id);
            true
        }
    }

    pub fn contains(&self, id: &RouteID) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteID> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_keeps_order() {
        let mut selection = RouteSelection::from_ids(vec![
            RouteID::new("B"),
            RouteID::new("A"),
            RouteID::new("B"),
        ]);
        assert_eq!(selection.len(), 2);

        assert!(selection.toggle(RouteID::new("C")));
        assert!(!selection.toggle(RouteID::new("B")));
        let ids: Vec<&str> = selection.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);

        assert!(!selection.toggle(RouteID::new("A")));
        assert!(!selection.toggle(RouteID::new("C")));
        assert!(selection.is_empty());
    }
}
