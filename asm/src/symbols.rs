//! Symbol table (§3): each name binds once, in insertion order (§9 "Symbol
//! table ordering" — do not rely on a hash map's iteration order for the
//! diagnostic dump).

use std::collections::HashMap;

use crate::error::SymbolError;

#[derive(Clone, Default, Debug)]
pub struct SymbolTable {
    order: Vec<(String, u16)>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn define(&mut self, name: &str, address: u16, line: u32) -> Result<(), SymbolError> {
        if self.index.contains_key(name) {
            return Err(SymbolError::Duplicate {
                name: name.to_string(),
                line,
            });
        }
        self.index.insert(name.to_string(), self.order.len());
        self.order.push((name.to_string(), address));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<u16, SymbolError> {
        self.index
            .get(name)
            .map(|&i| self.order[i].1)
            .ok_or_else(|| SymbolError::Undefined {
                name: name.to_string(),
            })
    }

    /// Entries in the order they were first defined.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.order.iter().map(|(name, addr)| (name.as_str(), *addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut table = SymbolTable::new();
        table.define("z", 1, 1).unwrap();
        table.define("a", 2, 2).unwrap();
        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn rejects_duplicate_definitions() {
        let mut table = SymbolTable::new();
        table.define("x", 1, 1).unwrap();
        assert!(table.define("x", 2, 2).is_err());
    }

    #[test]
    fn undefined_lookup_is_an_error() {
        let table = SymbolTable::new();
        assert!(table.resolve("missing").is_err());
    }
}
