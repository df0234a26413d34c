//! Immutable request-scoped context.
//!
//! A [`Context`] is a linked chain of key/value nodes. Attaching a value never
//! touches the existing chain: it returns a new context whose head points at
//! the old one, so sibling call trees share their common ancestors and never
//! see each other's values.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A key under which a value can be stored in a [`Context`].
///
/// Keys are types. Keeping the key type private to a module makes its slot
/// unreachable (and therefore collision-free) for everybody else.
pub trait ContextKey: 'static {
    /// Type of the value stored under this key.
    type Value: Send + Sync + 'static;
}

struct Node {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

/// Immutable, cheaply clonable request-scoped value carrier.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

impl Context {
    /// The empty root context.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Return a new context that carries `value` under `K`.
    ///
    /// Any value already stored under `K` further up the chain is shadowed,
    /// not replaced.
    #[must_use]
    pub fn with_value<K: ContextKey>(&self, value: K::Value) -> Self {
        Self {
            head: Some(Arc::new(Node {
                key: TypeId::of::<K>(),
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up the innermost value stored under `K`.
    #[must_use]
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        let key = TypeId::of::<K>();
        self.nodes()
            .find(|node| node.key == key)
            .and_then(|node| node.value.downcast_ref::<K::Value>())
    }

    /// Number of nodes between this context and the background root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes().count()
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .finish()
    }
}
