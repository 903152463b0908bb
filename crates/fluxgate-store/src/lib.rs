/// Store modules that hold application state
/// Each store is responsible for a slice of the application state and
/// declares which actions it handles through its routes.
mod notify;
mod routes;
mod store;

pub use notify::{ChangeNotifier, ObserverId};
pub use routes::{RouteKey, Routes};
pub use store::{Store, StoreRef};
