use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating declared MIME types: `type/subtype` with optional parameters
    /// - Valid: "text/plain", "application/vnd.ms-excel", "text/html; charset=utf-8"
    /// - Invalid: "text", "/plain", "text/", "text plain", "text/pl ain"
    pub static ref MIME_TYPE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*(\s*;.*)?$")
            .unwrap();
}
