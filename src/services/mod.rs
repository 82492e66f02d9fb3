pub mod link_dispatcher;

pub use link_dispatcher::{DispatchError, LinkDispatcher};
