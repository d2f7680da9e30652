pub mod aggregate;
pub mod dispatch;
pub mod service;

pub use aggregate::aggregate;
pub use dispatch::Dispatcher;
pub use service::NearbyCarparks;

#[cfg(test)]
pub(crate) mod testing;
