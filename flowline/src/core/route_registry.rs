//! Route registration pass and the frozen route table served to requests.
//!
//! [`RouteRegistry`] is filled by a single registration pass. Conflicts are
//! returned as values so the caller can abort on the first one or collect all
//! of them. [`RouteRegistry::freeze`] publishes a [`RouteTable`] built from
//! immutable entry copies; the table is shared across request threads without
//! locking.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::core::errors::RouteConfigError;
use crate::core::route_pattern::RoutePattern;
use crate::core::route_target::RouteTarget;
use crate::core::types::{ComponentId, LayoutId};

#[derive(Debug, Clone)]
struct Registered {
    pattern: RoutePattern,
    target: RouteTarget,
}

/// One route to register: pattern, navigation target and parent layouts
/// (outermost first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub pattern: String,
    pub target: ComponentId,
    pub parent_layouts: Vec<LayoutId>,
}

/// Mutable route configuration built during the registration pass.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    // Keyed by pattern shape so `users/{id}` and `users/{name}` collide.
    routes: HashMap<String, Registered>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` for `pattern` with its parent layout chain.
    ///
    /// A failed registration leaves the registry unchanged.
    pub fn register(
        &mut self,
        pattern: &str,
        target: ComponentId,
        parent_layouts: Vec<LayoutId>,
    ) -> Result<&RouteTarget, RouteConfigError> {
        let pattern = RoutePattern::parse(pattern)?;
        let shape = pattern.shape();
        if !self.routes.contains_key(&shape) {
            self.check_optional_overlap(&pattern, &shape, &target)?;
        }

        match self.routes.entry(shape) {
            Entry::Occupied(occupied) => {
                let existing = occupied.into_mut();
                // One-shot assignment rejects the second target and leaves the
                // stored entry untouched.
                existing
                    .target
                    .set_target(target)
                    .map_err(|err| err.with_pattern(existing.pattern.as_str()))?;
                existing.target.set_parent_layouts(parent_layouts)?;
                Ok(&existing.target)
            }
            Entry::Vacant(vacant) => {
                let mut entry = RouteTarget::new(target);
                entry.set_parent_layouts(parent_layouts)?;
                debug!(
                    pattern = pattern.as_str(),
                    target = ?entry.target(),
                    layouts = entry.parent_layouts().len(),
                    "route registered"
                );
                let registered = vacant.insert(Registered {
                    pattern,
                    target: entry,
                });
                Ok(&registered.target)
            }
        }
    }

    /// Reject a plain route sharing its path with an optional parameter
    /// route, in either registration order.
    fn check_optional_overlap(
        &self,
        pattern: &RoutePattern,
        shape: &str,
        target: &ComponentId,
    ) -> Result<(), RouteConfigError> {
        // (pattern of the existing route, plain target, optional target)
        let conflict = if pattern.has_optional() {
            pattern.overlapped_shapes().iter().find_map(|overlapped| {
                let existing = self.routes.get(overlapped)?;
                let plain = existing.target.target()?.clone();
                Some((existing.pattern.as_str(), plain, target.clone()))
            })
        } else {
            self.routes.values().find_map(|existing| {
                let overlaps = existing
                    .pattern
                    .overlapped_shapes()
                    .iter()
                    .any(|overlapped| overlapped == shape);
                if !overlaps {
                    return None;
                }
                let optional = existing.target.target()?.clone();
                Some((existing.pattern.as_str(), target.clone(), optional))
            })
        };

        match conflict {
            Some((existing, plain, optional)) => Err(RouteConfigError::UnusedOptional {
                pattern: existing.to_string(),
                target: plain,
                optional,
            }),
            None => Ok(()),
        }
    }

    /// Register every definition, collecting all conflicts instead of
    /// stopping at the first one.
    pub fn register_all<I>(&mut self, definitions: I) -> Result<(), Vec<RouteConfigError>>
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        let mut errors = Vec::new();
        for definition in definitions {
            if let Err(err) = self.register(
                &definition.pattern,
                definition.target,
                definition.parent_layouts,
            ) {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Replace the parent layout chain of an already registered route.
    pub fn set_parent_layouts(
        &mut self,
        pattern: &str,
        parent_layouts: Vec<LayoutId>,
    ) -> Result<(), RouteConfigError> {
        let shape = RoutePattern::parse(pattern)?.shape();
        let registered = self
            .routes
            .get_mut(&shape)
            .ok_or_else(|| RouteConfigError::UnknownRoute {
                pattern: pattern.to_string(),
            })?;
        registered.target.set_parent_layouts(parent_layouts)
    }

    /// Drop the route registered for `pattern`, returning its entry.
    pub fn remove(&mut self, pattern: &str) -> Option<RouteTarget> {
        let shape = RoutePattern::parse(pattern).ok()?.shape();
        self.routes.remove(&shape).map(|registered| registered.target)
    }

    pub fn get(&self, pattern: &str) -> Option<&RouteTarget> {
        let shape = RoutePattern::parse(pattern).ok()?.shape();
        self.routes.get(&shape).map(|registered| &registered.target)
    }

    /// True if any route is bound to `target`.
    pub fn contains_target(&self, target: &ComponentId) -> bool {
        self.routes
            .values()
            .any(|registered| registered.target.target() == Some(target))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Publish the configuration as an immutable route table.
    pub fn freeze(self) -> RouteTable {
        let mut routes: Vec<Registered> = self
            .routes
            .into_values()
            .map(|registered| Registered {
                target: registered.target.copy_as_immutable(),
                pattern: registered.pattern,
            })
            .collect();
        // Most specific first so `resolve` can stop at the first match.
        routes.sort_by(|a, b| {
            b.pattern
                .specificity()
                .cmp(&a.pattern.specificity())
                .then_with(|| a.pattern.as_str().cmp(b.pattern.as_str()))
        });
        let by_shape = routes
            .iter()
            .enumerate()
            .map(|(index, registered)| (registered.pattern.shape(), index))
            .collect();
        debug!(routes = routes.len(), "route table frozen");
        RouteTable {
            inner: Arc::new(TableInner { routes, by_shape }),
        }
    }
}

#[derive(Debug)]
struct TableInner {
    routes: Vec<Registered>,
    by_shape: HashMap<String, usize>,
}

/// Immutable snapshot of the routing configuration.
///
/// Cloning is cheap; all clones share the same entries.
#[derive(Debug, Clone)]
pub struct RouteTable {
    inner: Arc<TableInner>,
}

/// Result of resolving a concrete URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub pattern: &'a str,
    pub entry: &'a RouteTarget,
    pub parameters: BTreeMap<String, String>,
}

impl RouteMatch<'_> {
    pub fn target(&self) -> Option<&ComponentId> {
        self.entry.target()
    }

    pub fn parent_layouts(&self) -> &[LayoutId] {
        self.entry.parent_layouts()
    }
}

impl RouteTable {
    /// Empty table, for a service started without routes.
    pub fn empty() -> Self {
        RouteRegistry::new().freeze()
    }

    /// Entry bound to exactly this pattern (parameter names ignored).
    pub fn get(&self, pattern: &str) -> Option<&RouteTarget> {
        let shape = RoutePattern::parse(pattern).ok()?.shape();
        let index = *self.inner.by_shape.get(&shape)?;
        Some(&self.inner.routes[index].target)
    }

    /// Find the most specific route matching a concrete URL path.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.inner.routes.iter().find_map(|registered| {
            registered
                .pattern
                .matches(path)
                .map(|parameters| RouteMatch {
                    pattern: registered.pattern.as_str(),
                    entry: &registered.target,
                    parameters,
                })
        })
    }

    /// All routes as `(pattern, entry)` in pattern order.
    pub fn routes(&self) -> Vec<(&str, &RouteTarget)> {
        let mut routes: Vec<(&str, &RouteTarget)> = self
            .inner
            .routes
            .iter()
            .map(|registered| (registered.pattern.as_str(), &registered.target))
            .collect();
        routes.sort_by(|a, b| a.0.cmp(b.0));
        routes
    }

    /// Patterns bound to `target`, sorted.
    pub fn patterns_for(&self, target: &ComponentId) -> Vec<&str> {
        let mut patterns: Vec<&str> = self
            .inner
            .routes
            .iter()
            .filter(|registered| registered.target.target() == Some(target))
            .map(|registered| registered.pattern.as_str())
            .collect();
        patterns.sort_unstable();
        patterns
    }

    pub fn len(&self) -> usize {
        self.inner.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.routes.is_empty()
    }
}
