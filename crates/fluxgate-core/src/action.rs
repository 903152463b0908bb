/// Action values that travel through the dispatcher.
/// All state mutations flow through Actions dispatched to the Dispatcher.
use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// A value that can be dispatched.
///
/// Action types form an explicit hierarchy. A type that refines another one
/// returns the embedded parent value from [`ActionData::parent`]; every chain
/// implicitly ends at the root kind, which also stands for the absent action.
/// Use the [`action_data!`](crate::action_data) macro rather than
/// implementing this by hand.
pub trait ActionData: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    /// The action this one refines, if any
    fn parent(&self) -> Option<&dyn ActionData> {
        None
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

crate::action_data!(String, &'static str, bool, i32, i64, u32, u64, usize);

/// Walks from `action` up through its parents, nearest first.
pub fn lineage<'a>(action: &'a dyn ActionData) -> impl Iterator<Item = &'a dyn ActionData> + 'a {
    std::iter::successors(Some(action), |current| current.parent())
}

/// Runtime type of a single lineage element.
pub fn type_of(action: &dyn ActionData) -> TypeId {
    action.as_any().type_id()
}

/// The value passed to one dispatch. Cheap to clone; may be absent.
#[derive(Clone, Default)]
pub struct Action(Option<Rc<dyn ActionData>>);

impl Action {
    pub fn new<A: ActionData>(data: A) -> Self {
        Self(Some(Rc::new(data)))
    }

    /// The absent action
    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn data(&self) -> Option<&dyn ActionData> {
        self.0.as_deref()
    }

    /// Views the action as `A`, either because it is an `A` or because it
    /// refines one.
    pub fn downcast_ref<A: ActionData>(&self) -> Option<&A> {
        self.data()
            .and_then(|data| lineage(data).find_map(|item| item.as_any().downcast_ref::<A>()))
    }

    pub fn is<A: ActionData>(&self) -> bool {
        self.downcast_ref::<A>().is_some()
    }

    pub fn type_name(&self) -> &'static str {
        self.data().map_or("<none>", |data| data.type_name())
    }

    /// Whether both point at the same action value. Two absent actions are
    /// considered the same.
    pub fn ptr_eq(&self, other: &Action) -> bool {
        match (&self.0, &other.0) {
            (Some(left), Some(right)) => std::ptr::addr_eq(Rc::as_ptr(left), Rc::as_ptr(right)),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Some(data) => write!(f, "Action({:?})", data),
            None => f.write_str("Action(<none>)"),
        }
    }
}

impl<A: ActionData> From<A> for Action {
    fn from(data: A) -> Self {
        Action::new(data)
    }
}
