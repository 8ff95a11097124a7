//! ANSI styles for markup tags

use logroute_core_types::Level;

pub const RESET: &str = "\x1b[0m";

/// Escape sequence for a markup tag name, `None` if the tag is unknown
pub fn tag_code(tag: &str) -> Option<&'static str> {
    let code = match tag {
        "black" => "\x1b[30m",
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        "magenta" => "\x1b[35m",
        "cyan" => "\x1b[36m",
        "white" => "\x1b[37m",
        "bold" | "b" => "\x1b[1m",
        "dim" | "d" => "\x1b[2m",
        "italic" | "i" => "\x1b[3m",
        "underline" | "u" => "\x1b[4m",
        _ => return None,
    };
    Some(code)
}

/// Style applied by the `<level>` tag
pub fn level_code(level: Level, success: bool) -> &'static str {
    if success {
        return "\x1b[32m\x1b[1m";
    }
    match level {
        Level::Trace => "\x1b[36m\x1b[1m",
        Level::Debug => "\x1b[34m\x1b[1m",
        Level::Info => "\x1b[1m",
        Level::Warning => "\x1b[33m\x1b[1m",
        Level::Error => "\x1b[31m\x1b[1m",
        Level::Critical => "\x1b[41m\x1b[1m",
    }
}
