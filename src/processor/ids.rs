//! Per-map id allocation shared by object lines and doors.

use std::collections::HashMap;

/// Hands out unique ids: the requested base first, then `base-2`,
/// `base-3`, … Every id ever issued stays reserved, so a suffix is never
/// reused even when an author later asks for it literally.
#[derive(Debug, Default)]
pub struct IdRegistry {
    /// issued id → last suffix tried for it as a base
    issued: HashMap<String, u32>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let base = match base.trim() {
            "" => "object",
            b => b,
        };
        let Some(&last) = self.issued.get(base) else {
            self.issued.insert(base.to_string(), 1);
            return base.to_string();
        };

        let mut suffix = last;
        loop {
            suffix += 1;
            let candidate = format!("{base}-{suffix}");
            if !self.issued.contains_key(&candidate) {
                self.issued.insert(base.to_string(), suffix);
                self.issued.insert(candidate.clone(), 1);
                return candidate;
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.issued.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collisions_get_increasing_suffixes() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.allocate("x"), "x");
        assert_eq!(ids.allocate("x"), "x-2");
        assert_eq!(ids.allocate("x"), "x-3");
    }

    #[test]
    fn test_literal_suffix_is_not_reissued() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.allocate("lamp"), "lamp");
        assert_eq!(ids.allocate("lamp-2"), "lamp-2");
        assert_eq!(ids.allocate("lamp"), "lamp-3");
        assert_eq!(ids.allocate("lamp-2"), "lamp-2-2");
        assert!(ids.contains("lamp-3"));
    }

    #[test]
    fn test_blank_base_falls_back() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.allocate("  "), "object");
        assert_eq!(ids.allocate(""), "object-2");
    }
}
