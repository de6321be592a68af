//! Client side of the dashboard: HTTP access, the user's filter selection,
//! and a controller that keeps the displayed view in step with it.

mod api;
mod controller;
mod state;

pub use api::{ClientError, DashboardApi, HttpDashboardApi, Session};
pub use controller::{ControllerOptions, DashboardController, ViewState};
pub use state::{FilterState, Selection};
