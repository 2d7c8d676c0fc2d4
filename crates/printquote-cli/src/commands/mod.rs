//! Subcommand implementations.

pub mod analyze;
pub mod estimate;
pub mod health;
pub mod materials;
pub mod profiles;
pub mod telemetry;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Serialize;

/// Parse repeated `key=value` arguments.
pub fn parse_params(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got {pair:?}");
        };
        params.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(params)
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["infill=30".into(), " units = inches ".into()]).unwrap();
        assert_eq!(params["infill"], "30");
        assert_eq!(params["units"], "inches");
        assert!(parse_params(&["infill".into()]).is_err());
    }
}
