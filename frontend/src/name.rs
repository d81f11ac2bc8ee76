use crate::utils::HashSetExtension;
use rustc_hash::FxHashSet;

/// Dispenses names that are unique across a whole program.
///
/// The dispenser is seeded with every name the program already contains.
/// Each name it hands out is recorded as well, so no two requests can ever
/// receive the same name, and no request can receive a name that existed
/// before. Ingot has a single flat namespace, which makes this global
/// uniqueness the only thing standing between spliced code and accidental
/// shadowing.
#[derive(Clone, Debug, Default)]
pub struct NameDispenser {
    used_names: FxHashSet<String>,
}

impl NameDispenser {
    pub fn new(used_names: FxHashSet<String>) -> Self {
        Self { used_names }
    }

    /// Returns `prefix` itself if it is non-empty and still free. Otherwise
    /// tries `prefix_1`, `prefix_2`, … and returns the first free candidate.
    pub fn new_name(&mut self, prefix: &str) -> String {
        let mut name = prefix.to_string();
        let mut suffix: usize = 0;
        while name.is_empty() || self.used_names.contains(&name) {
            suffix += 1;
            name = format!("{prefix}_{suffix}");
        }
        self.used_names.force_insert(name.clone());
        name
    }
}

#[test]
fn test_free_prefix_is_returned_unchanged() {
    let mut dispenser = NameDispenser::default();
    assert_eq!(dispenser.new_name("banana"), "banana");
    assert_eq!(dispenser.new_name("banana"), "banana_1");
    assert_eq!(dispenser.new_name("banana"), "banana_2");
}

#[test]
fn test_seeded_names_are_never_dispensed() {
    let mut dispenser =
        NameDispenser::new(["x".to_string(), "x_1".to_string()].into_iter().collect());
    assert_eq!(dispenser.new_name("x"), "x_2");
    assert_eq!(dispenser.new_name("y"), "y");
}

#[test]
fn test_empty_prefix_gets_a_suffix_immediately() {
    let mut dispenser = NameDispenser::default();
    assert_eq!(dispenser.new_name(""), "_1");
    assert_eq!(dispenser.new_name(""), "_2");
}
