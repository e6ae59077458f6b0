//! Named extension points with priority-ordered interceptors.
//!
//! The element finder calls `parser-find-element-<name>` after each element it
//! matches and `parser-find-elements` after appending it to the list. Lower
//! priority runs first; registering the same priority again replaces the
//! earlier entry.

use crate::model::Element;
use std::collections::HashMap;
use std::fmt;

/// Name of the hook fired after each element is appended to the block's list.
pub const FIND_ELEMENTS: &str = "parser-find-elements";

/// Name of the hook fired for each element, before it is appended.
pub fn find_element(name: &str) -> String {
    format!("parser-find-element-{name}")
}

pub const DEFAULT_PRIORITY: i32 = 100;

/// Mutates one freshly matched element. Arguments: element, block text, filename.
pub type ElementHook = Box<dyn Fn(&mut Element, &str, &str)>;

/// Rewrites the element list; the newest element is the last one.
/// Arguments: elements, block text, filename.
pub type ElementsHook = Box<dyn Fn(&mut Vec<Element>, &str, &str)>;

pub enum Hook {
    Element(ElementHook),
    Elements(ElementsHook),
}

struct Entry {
    priority: i32,
    hook: Hook,
}

#[derive(Default)]
pub struct Hooks {
    entries: HashMap<String, Vec<Entry>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        names.sort_unstable();
        f.debug_struct("Hooks").field("entries", &names).finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, priority: i32, hook: Hook) {
        let list = self.entries.entry(name.to_string()).or_default();
        let mut pos = 0;
        let mut replace = false;
        for (i, entry) in list.iter().enumerate() {
            if priority == entry.priority {
                pos = i;
                replace = true;
            } else if priority > entry.priority {
                pos = i + 1;
            }
        }
        let entry = Entry { priority, hook };
        if replace {
            list[pos] = entry;
        } else {
            list.insert(pos, entry);
        }
    }

    pub fn add_element_hook<F>(&mut self, name: &str, priority: i32, f: F)
    where
        F: Fn(&mut Element, &str, &str) + 'static,
    {
        self.add(name, priority, Hook::Element(Box::new(f)));
    }

    pub fn add_elements_hook<F>(&mut self, name: &str, priority: i32, f: F)
    where
        F: Fn(&mut Vec<Element>, &str, &str) + 'static,
    {
        self.add(name, priority, Hook::Elements(Box::new(f)));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|l| !l.is_empty())
    }

    pub fn apply_element(&self, name: &str, element: &mut Element, block: &str, filename: &str) {
        for entry in self.entries.get(name).into_iter().flatten() {
            if let Hook::Element(f) = &entry.hook {
                f(element, block, filename);
            }
        }
    }

    pub fn apply_elements(&self, name: &str, elements: &mut Vec<Element>, block: &str, filename: &str) {
        for entry in self.entries.get(name).into_iter().flatten() {
            if let Hook::Elements(f) = &entry.hook {
                f(elements, block, filename);
            }
        }
    }
}
