pub mod actuation;
pub mod capture;
pub mod color;
pub mod detection;
pub mod pipeline;
pub mod routing;
pub mod shared;
pub mod tracking;
