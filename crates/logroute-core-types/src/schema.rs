//! Canonical schema constants for serialized log records
//!
//! These keys are shared by the JSON renderer and by tests asserting on it.

// Envelope
pub const FIELD_TEXT: &str = "text";
pub const FIELD_RECORD: &str = "record";

// Record fields
pub const FIELD_TIME: &str = "time";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_LEVEL_NAME: &str = "name";
pub const FIELD_LEVEL_NO: &str = "no";
pub const FIELD_SUCCESS: &str = "success";
pub const FIELD_NAME: &str = "name";
pub const FIELD_BOUND_NAME: &str = "bound_name";
pub const FIELD_MODULE: &str = "module";
pub const FIELD_FUNCTION: &str = "function";
pub const FIELD_FILE: &str = "file";
pub const FIELD_LINE: &str = "line";
pub const FIELD_THREAD: &str = "thread";
pub const FIELD_MESSAGE: &str = "message";

// Exception fields
pub const FIELD_EXCEPTION: &str = "exception";
pub const FIELD_EXC_TYPE: &str = "type";
pub const FIELD_EXC_VALUE: &str = "value";
pub const FIELD_EXC_CAUSES: &str = "causes";
pub const FIELD_EXC_DEBUG: &str = "debug";
pub const FIELD_EXC_BACKTRACE: &str = "backtrace";

/// Label rendered for success-tagged INFO records
pub const SUCCESS_LABEL: &str = "SUCCESS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_keys_are_distinct() {
        assert_ne!(FIELD_TEXT, FIELD_RECORD);
    }

    #[test]
    fn test_exception_keys_are_distinct() {
        let keys = [
            FIELD_EXC_TYPE,
            FIELD_EXC_VALUE,
            FIELD_EXC_CAUSES,
            FIELD_EXC_DEBUG,
            FIELD_EXC_BACKTRACE,
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
