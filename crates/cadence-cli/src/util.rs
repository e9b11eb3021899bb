use anyhow::{anyhow, Result};
use uuid::Uuid;

pub fn parse_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).map_err(|_| anyhow!("'{}' is not a valid id", input))
}

/// Site arguments default to the nil id, which stands for the primary site.
pub fn parse_site(input: Option<&str>) -> Result<Uuid> {
    match input {
        Some(site) => parse_id(site),
        None => Ok(Uuid::nil()),
    }
}
