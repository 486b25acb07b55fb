//! Route target: the navigation target and parent layout chain bound to one route.

use std::sync::Arc;

use crate::core::errors::RouteConfigError;
use crate::core::types::{ComponentId, LayoutId};

/// Binds exactly one navigation target and its parent layout chain to a route.
///
/// Entries are created mutable during the registration pass and published as
/// immutable copies. The target is one-shot: a second assignment is reported
/// as an ambiguous route instead of overwriting the first.
///
/// Parent layouts are ordered outermost first and are replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    target: Option<ComponentId>,
    parent_layouts: Option<Arc<[LayoutId]>>,
    mutable: bool,
}

impl RouteTarget {
    /// Create a mutable entry with `target` bound.
    pub fn new(target: ComponentId) -> Self {
        Self::with_mutability(target, true)
    }

    /// Create an entry with `target` bound and the given mutability.
    pub fn with_mutability(target: ComponentId, mutable: bool) -> Self {
        Self {
            target: Some(target),
            parent_layouts: None,
            mutable,
        }
    }

    /// Bind the navigation target.
    ///
    /// Fails with [`RouteConfigError::ImmutableMutation`] on a frozen entry and
    /// with [`RouteConfigError::AmbiguousRoute`] when a target is already
    /// bound, even if it is the same one.
    pub fn set_target(&mut self, target: ComponentId) -> Result<(), RouteConfigError> {
        self.ensure_mutable()?;
        if let Some(existing) = &self.target {
            return Err(RouteConfigError::AmbiguousRoute {
                pattern: None,
                existing: existing.clone(),
                attempted: target,
            });
        }
        self.target = Some(target);
        Ok(())
    }

    /// Replace the parent layout chain.
    pub fn set_parent_layouts(
        &mut self,
        parents: impl Into<Vec<LayoutId>>,
    ) -> Result<(), RouteConfigError> {
        self.ensure_mutable()?;
        self.parent_layouts = Some(Arc::from(parents.into()));
        Ok(())
    }

    pub fn target(&self) -> Option<&ComponentId> {
        self.target.as_ref()
    }

    /// Parent layout chain, empty when none was set.
    pub fn parent_layouts(&self) -> &[LayoutId] {
        self.parent_layouts.as_deref().unwrap_or(&[])
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Copy this entry. The copy shares the parent layout chain with `self`.
    pub fn copy(&self, mutable: bool) -> Self {
        Self {
            target: self.target.clone(),
            parent_layouts: self.parent_layouts.clone(),
            mutable,
        }
    }

    /// Immutable copy for publishing into a live route table.
    pub fn copy_as_immutable(&self) -> Self {
        self.copy(false)
    }

    /// True if both entries share the same parent layout allocation.
    pub fn shares_layouts_with(&self, other: &RouteTarget) -> bool {
        match (&self.parent_layouts, &other.parent_layouts) {
            (Some(left), Some(right)) => Arc::ptr_eq(left, right),
            (None, None) => true,
            _ => false,
        }
    }

    fn ensure_mutable(&self) -> Result<(), RouteConfigError> {
        if self.mutable {
            Ok(())
        } else {
            Err(RouteConfigError::ImmutableMutation)
        }
    }
}
