// Foreground 30-37 are the normal colors, 90-97 the bright ones.
// Usage: `logmsg!(logger, "{}warning{}", color::YELLOW, color::RESET)`

pub const YELLOW_ON_BLACK: &str = "\x1b[93m\x1b[40m";
pub const YELLOW_ON_BLUE: &str = "\x1b[93m\x1b[44m";
pub const YELLOW_ON_GREEN: &str = "\x1b[93m\x1b[42m";
pub const YELLOW_ON_RED: &str = "\x1b[93m\x1b[41m";
pub const YELLOW_ON_VIOLET: &str = "\x1b[93m\x1b[45m";

pub const WHITE: &str = "";
/// Bright red.
pub const RED: &str = "\x1b[91m";
/// Bright green.
pub const GREEN: &str = "\x1b[92m";
/// Bright violet.
pub const VIOLET: &str = "\x1b[95m";
/// Bright yellow.
pub const YELLOW: &str = "\x1b[93m";
/// Back to the terminal's default colors.
pub const RESET: &str = "\x1b[0m";
