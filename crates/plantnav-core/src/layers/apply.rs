//! Layer application
//!
//! Applies a composed visibility map to the DOM. How a layer is shown is
//! decided entirely by its `LayerPresentation`; nothing here knows about any
//! individual layer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::dom::{DomEnvironment, ElementRef};
use crate::errors::{ExError, NavError};
use crate::rules::{LayerDescriptor, LayerMap, LayerPresentation, RuleTable};

/// Custom show/hide logic for layers declared with `kind: custom`
pub trait LayerHandler {
    /// Show or hide `element`
    ///
    /// # Errors
    /// Returns an error if the DOM mutation fails.
    fn apply(
        &self,
        dom: &dyn DomEnvironment,
        element: &ElementRef,
        visible: bool,
    ) -> Result<(), ExError>;
}

impl<F> LayerHandler for F
where
    F: Fn(&dyn DomEnvironment, &ElementRef, bool) -> Result<(), ExError>,
{
    fn apply(
        &self,
        dom: &dyn DomEnvironment,
        element: &ElementRef,
        visible: bool,
    ) -> Result<(), ExError> {
        self(dom, element, visible)
    }
}

/// Result of applying one layer
#[derive(Debug, Clone)]
pub struct LayerOutcome {
    pub layer: String,
    pub visible: bool,
    pub result: Result<(), ExError>,
}

impl LayerOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Applies visibility maps through a DOM environment, caching element lookups
pub struct LayerApplier {
    rules: Rc<RuleTable>,
    dom: Rc<dyn DomEnvironment>,
    handlers: HashMap<String, Rc<dyn LayerHandler>>,
    cache: RefCell<HashMap<String, ElementRef>>,
}

impl LayerApplier {
    pub fn new(rules: Rc<RuleTable>, dom: Rc<dyn DomEnvironment>) -> Self {
        Self {
            rules,
            dom,
            handlers: HashMap::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Register the handler backing `kind: custom` layers named `name`
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Rc<dyn LayerHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn dom(&self) -> &Rc<dyn DomEnvironment> {
        &self.dom
    }

    /// Apply every `(layer, visible)` pair; one failure does not stop the rest
    pub fn apply(&self, layers: &LayerMap) -> Vec<LayerOutcome> {
        layers
            .iter()
            .map(|(layer, visible)| {
                let result = self.apply_one(layer, *visible);
                if let Err(err) = &result {
                    warn!(layer = layer.as_str(), visible, error = %err, "layer not applied");
                }
                LayerOutcome {
                    layer: layer.clone(),
                    visible: *visible,
                    result,
                }
            })
            .collect()
    }

    /// Apply a single layer
    ///
    /// # Errors
    /// Fails on an undeclared layer, a missing element, a missing custom
    /// handler or a failing DOM primitive.
    pub fn apply_one(&self, layer: &str, visible: bool) -> Result<(), ExError> {
        let descriptor = self.rules.layer(layer).ok_or_else(|| -> ExError {
            NavError::UnknownLayer {
                layer: layer.to_string(),
            }
            .into()
        })?;
        let element = self.resolve(descriptor)?;
        self.present(descriptor, &element, visible)
    }

    /// Drop every cached element; the next application looks them up again
    pub fn refresh_cache(&self) {
        let dropped = {
            let mut cache = self.cache.borrow_mut();
            let n = cache.len();
            cache.clear();
            n
        };
        debug!(dropped, "layer element cache cleared");
    }

    pub fn cached_elements(&self) -> usize {
        self.cache.borrow().len()
    }

    fn resolve(&self, descriptor: &LayerDescriptor) -> Result<ElementRef, ExError> {
        if let Some(element) = self.cache.borrow().get(&descriptor.key) {
            return Ok(element.clone());
        }
        let element = self.dom.lookup(&descriptor.element).ok_or_else(|| -> ExError {
            NavError::ElementNotFound {
                locator: descriptor.element.clone(),
            }
            .into()
        })?;
        self.cache
            .borrow_mut()
            .insert(descriptor.key.clone(), element.clone());
        Ok(element)
    }

    fn present(
        &self,
        descriptor: &LayerDescriptor,
        element: &ElementRef,
        visible: bool,
    ) -> Result<(), ExError> {
        let dom = self.dom.as_ref();
        match &descriptor.presentation {
            LayerPresentation::Class {
                shown_class,
                hidden_class,
            } => {
                if let Some(class) = shown_class {
                    if visible {
                        dom.add_class(element, class)?;
                    } else {
                        dom.remove_class(element, class)?;
                    }
                }
                if let Some(class) = hidden_class {
                    if visible {
                        dom.remove_class(element, class)?;
                    } else {
                        dom.add_class(element, class)?;
                    }
                }
                Ok(())
            }
            LayerPresentation::Style {
                property,
                shown,
                hidden,
            } => dom.set_style(element, property, if visible { shown } else { hidden }),
            LayerPresentation::Custom { handler } => {
                let handler = self.handlers.get(handler).ok_or_else(|| -> ExError {
                    NavError::MissingLayerHandler {
                        handler: handler.clone(),
                    }
                    .into()
                })?;
                handler.apply(dom, element, visible)
            }
        }
    }
}
