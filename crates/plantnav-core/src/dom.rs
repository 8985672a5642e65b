//! DOM environment abstraction
//!
//! The navigation core never touches real elements. Layer application and
//! DOM-closed panels go through `DomEnvironment`, which the host application
//! implements over its document. `MemoryDom` is an in-memory implementation
//! used by tests and by the simulation CLI.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::errors::{collaborator_failed, ExError, NavError};

/// Opaque handle to a located element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Element lookup and class/style mutation primitives
pub trait DomEnvironment {
    /// Locate an element; `None` if it is not in the document
    fn lookup(&self, locator: &str) -> Option<ElementRef>;

    /// Add a CSS class
    ///
    /// # Errors
    /// Returns an error if the element is gone or the mutation fails.
    fn add_class(&self, element: &ElementRef, class: &str) -> Result<(), ExError>;

    /// Remove a CSS class
    ///
    /// # Errors
    /// Returns an error if the element is gone or the mutation fails.
    fn remove_class(&self, element: &ElementRef, class: &str) -> Result<(), ExError>;

    fn has_class(&self, element: &ElementRef, class: &str) -> bool;

    /// Set an inline style property
    ///
    /// # Errors
    /// Returns an error if the element is gone or the mutation fails.
    fn set_style(&self, element: &ElementRef, property: &str, value: &str)
        -> Result<(), ExError>;

    fn style(&self, element: &ElementRef, property: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct MemoryElement {
    classes: BTreeSet<String>,
    styles: BTreeMap<String, String>,
}

/// In-memory document keyed by locator
#[derive(Debug, Default)]
pub struct MemoryDom {
    elements: RefCell<HashMap<String, MemoryElement>>,
    failing: RefCell<HashSet<String>>,
    lookups: Cell<usize>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document containing the given locators
    pub fn with_elements<I, S>(locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dom = Self::new();
        for locator in locators {
            dom.insert(locator);
        }
        dom
    }

    pub fn insert(&self, locator: impl Into<String>) {
        self.elements
            .borrow_mut()
            .entry(locator.into())
            .or_default();
    }

    pub fn remove(&self, locator: &str) {
        self.elements.borrow_mut().remove(locator);
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.elements.borrow().contains_key(locator)
    }

    /// Make every mutation on `locator` fail
    pub fn fail_mutations_on(&self, locator: impl Into<String>) {
        self.failing.borrow_mut().insert(locator.into());
    }

    /// Number of `lookup` calls served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.get()
    }

    pub fn classes_of(&self, locator: &str) -> Vec<String> {
        self.elements
            .borrow()
            .get(locator)
            .map(|e| e.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn style_of(&self, locator: &str, property: &str) -> Option<String> {
        self.elements
            .borrow()
            .get(locator)
            .and_then(|e| e.styles.get(property).cloned())
    }

    fn mutate<F>(&self, element: &ElementRef, op: &str, f: F) -> Result<(), ExError>
    where
        F: FnOnce(&mut MemoryElement),
    {
        if self.failing.borrow().contains(element.as_str()) {
            return Err(collaborator_failed("dom", format!("{} rejected on {}", op, element))
                .with_op(op.to_string()));
        }
        let mut elements = self.elements.borrow_mut();
        let target = elements
            .get_mut(element.as_str())
            .ok_or_else(|| -> ExError {
                NavError::ElementNotFound {
                    locator: element.as_str().to_string(),
                }
                .into()
            })?;
        f(target);
        Ok(())
    }
}

impl DomEnvironment for MemoryDom {
    fn lookup(&self, locator: &str) -> Option<ElementRef> {
        self.lookups.set(self.lookups.get() + 1);
        self.contains(locator).then(|| ElementRef::new(locator))
    }

    fn add_class(&self, element: &ElementRef, class: &str) -> Result<(), ExError> {
        self.mutate(element, "add_class", |e| {
            e.classes.insert(class.to_string());
        })
    }

    fn remove_class(&self, element: &ElementRef, class: &str) -> Result<(), ExError> {
        self.mutate(element, "remove_class", |e| {
            e.classes.remove(class);
        })
    }

    fn has_class(&self, element: &ElementRef, class: &str) -> bool {
        self.elements
            .borrow()
            .get(element.as_str())
            .is_some_and(|e| e.classes.contains(class))
    }

    fn set_style(
        &self,
        element: &ElementRef,
        property: &str,
        value: &str,
    ) -> Result<(), ExError> {
        self.mutate(element, "set_style", |e| {
            e.styles.insert(property.to_string(), value.to_string());
        })
    }

    fn style(&self, element: &ElementRef, property: &str) -> Option<String> {
        self.style_of(element.as_str(), property)
    }
}
