use crate::geometry::VACUUM;

/// Medium names known to one geometry definition, indexed by insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediumTable {
    names: Vec<String>,
}

impl MediumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, appending it if it is new.
    pub fn add(&mut self, name: &str) -> i32 {
        match self.index_of(name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.names.len() as i32 - 1
            }
        }
    }

    pub fn index_of(&self, name: &str) -> Option<i32> {
        self.names.iter().position(|n| n == name).map(|i| i as i32)
    }

    pub fn name(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Name for log output; vacuum and unknown indices get a placeholder.
    pub fn display_name(&self, index: i32) -> String {
        if index == VACUUM {
            return "vacuum".to_string();
        }
        match self.name(index) {
            Some(name) => name.to_string(),
            None => format!("<medium {}>", index),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_returns_existing_index() {
        let mut media = MediumTable::new();
        assert_eq!(media.add("H2O"), 0);
        assert_eq!(media.add("AIR"), 1);
        assert_eq!(media.add("H2O"), 0);
        assert_eq!(media.len(), 2);
        assert_eq!(media.index_of("AIR"), Some(1));
        assert_eq!(media.index_of("PB"), None);
    }

    #[test]
    fn names_and_vacuum() {
        let mut media = MediumTable::new();
        media.add("H2O");
        assert_eq!(media.name(0), Some("H2O"));
        assert_eq!(media.name(-1), None);
        assert_eq!(media.display_name(VACUUM), "vacuum");
        assert_eq!(media.display_name(4), "<medium 4>");
    }
}
