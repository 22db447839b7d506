pub mod controller;
pub mod error;
pub mod registry;
pub mod remote;
pub mod session;
pub mod transport;

pub use controller::{AuthMode, ViewController, ViewEvent, ViewState};
pub use error::{ControllerError, RemoteError, SessionError, TransportError, UserAction};
pub use registry::TaskRegistry;
pub use remote::RemoteClient;
pub use session::SessionStore;
pub use transport::HttpRemoteClient;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod session_tests;

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod registry_tests;

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod controller_tests;

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod transport_tests;
