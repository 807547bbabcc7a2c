//! Temporary Name Generator
//!
//! Unique shell variable names for one compilation. Owned by the compiler
//! instance, so two compilations never share counters.

#[derive(Debug, Default)]
pub struct NameGenerator {
    counter: usize,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id; use it to build a family of related names.
    pub fn next_id(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    /// `_<base>_<n>`
    pub fn fresh(&mut self, base: &str) -> String {
        format!("_{}_{}", base, self.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names = NameGenerator::new();
        assert_eq!(names.fresh("join"), "_join_1");
        assert_eq!(names.fresh("join"), "_join_2");
        assert_eq!(names.next_id(), 3);
    }

    #[test]
    fn test_generators_are_independent() {
        let mut a = NameGenerator::new();
        let mut b = NameGenerator::new();
        a.fresh("x");
        assert_eq!(b.fresh("x"), "_x_1");
    }
}
