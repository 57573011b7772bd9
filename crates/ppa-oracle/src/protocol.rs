//! File-based request/response protocol spoken by the PPA oracle.
//!
//! A request is one value per line in declaration order, without header or
//! quoting. The response is whatever the oracle prints; its last non-blank
//! line must hold the integer cost.

use ppa_types::{Configuration, Cost, OracleError};

/// Render the request artifact body for `config`.
pub fn render_request(config: &Configuration) -> String {
    let mut body = String::new();
    for value in config.values() {
        body.push_str(&value.to_string());
        body.push('\n');
    }
    body
}

/// Extract the cost from the oracle's standard output.
pub fn parse_response(stdout: &str) -> Result<Cost, OracleError> {
    let line = stdout
        .trim()
        .lines()
        .last()
        .map(str::trim)
        .ok_or(OracleError::EmptyOutput)?;

    let value: i64 = line.parse().map_err(|_| OracleError::MalformedOutput {
        line: line.to_string(),
    })?;
    Cost::try_from(value).map_err(|_| OracleError::NegativeCost { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_one_value_per_line() {
        let config = Configuration::new()
            .with("div_algo", 2)
            .with("bp_init_guess", 0)
            .with("vdd", 0.85);
        assert_eq!(render_request(&config), "2\n0\n0.85\n");
    }

    #[test]
    fn response_takes_last_line() {
        let stdout = "Division algorithm: 2\nCache ways: 3\n  1234  \n\n";
        assert_eq!(parse_response(stdout).unwrap(), 1234);
        assert_eq!(parse_response("42").unwrap(), 42);
        assert_eq!(parse_response("warmup\r\n17\r\n").unwrap(), 17);
    }

    #[test]
    fn response_errors() {
        assert!(matches!(parse_response(""), Err(OracleError::EmptyOutput)));
        assert!(matches!(parse_response(" \n\t\n"), Err(OracleError::EmptyOutput)));
        match parse_response("12\nsimulation done") {
            Err(OracleError::MalformedOutput { line }) => assert_eq!(line, "simulation done"),
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
        assert!(matches!(parse_response("3.5"), Err(OracleError::MalformedOutput { .. })));
        assert!(matches!(
            parse_response("-7"),
            Err(OracleError::NegativeCost { value: -7 })
        ));
    }
}
