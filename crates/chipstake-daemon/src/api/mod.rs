mod handlers;
mod responses;
mod server;

pub use handlers::{EventsQuery, PageQuery};
pub use responses::*;
pub use server::{ApiServer, ApiState};

#[cfg(test)]
mod tests;
