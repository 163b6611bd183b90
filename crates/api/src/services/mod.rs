//! Business services layered over the repositories and outbound clients.

pub mod auth;
pub mod dashboard;
pub mod media;
pub mod orders;
pub mod pincode;

pub use auth::{AuthError, AuthService};
pub use dashboard::DashboardService;
pub use media::{MediaClient, MediaError};
pub use orders::{OrderService, OrderServiceError};
pub use pincode::{PincodeClient, PincodeError};
