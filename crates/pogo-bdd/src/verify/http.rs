use crate::error::VerifyError;
use crate::http::HttpExchange;

pub fn assert_status(exchange: &HttpExchange, expected: u16) -> Result<(), VerifyError> {
    if exchange.status == expected {
        Ok(())
    } else {
        Err(VerifyError::HttpStatus {
            expected,
            actual: exchange.status,
            body: exchange.body.clone(),
        })
    }
}

/// Header names compare case-insensitively, values exactly.
pub fn assert_header(exchange: &HttpExchange, name: &str, expected: &str) -> Result<(), VerifyError> {
    let actual = exchange.header(name);
    if actual == Some(expected) {
        Ok(())
    } else {
        Err(VerifyError::Header {
            name: name.to_string(),
            expected: expected.to_string(),
            actual: actual.map(str::to_string),
        })
    }
}
