use chrono::{DateTime, Utc};

#[cfg(not(test))]
/// Returns the current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;
