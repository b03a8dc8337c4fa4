mod profile;
mod trend;
mod user;

pub use profile::{Profile, ProfileInput};
pub use trend::{NewTrend, Trend, TrendFilter, TrendUpdate};
pub use user::{NewUser, User, UserUpdate};
