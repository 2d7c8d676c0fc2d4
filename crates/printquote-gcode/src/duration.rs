//! Human-readable duration parsing.

/// Parse a duration such as `1d 2h 3m 4s`, `2h3m`, `45s` or
/// `1 hours 23 minutes` into seconds.
///
/// Any subset of day/hour/minute/second components may appear. A bare
/// number is taken as seconds. Returns `None` when nothing parses.
pub fn parse_duration(text: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut found = false;
    let mut chars = text.trim().chars().peekable();

    while chars.peek().is_some() {
        while chars.peek().is_some_and(|c| !c.is_ascii_digit() && *c != '.') {
            chars.next();
        }

        let mut number = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                chars.next();
            } else {
                break;
            }
        }
        if number.is_empty() {
            break;
        }
        let value: f64 = number.parse().ok()?;

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut unit = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphabetic() {
                unit.push(c.to_ascii_lowercase());
                chars.next();
            } else {
                break;
            }
        }

        let scale = match unit.as_str() {
            "d" | "day" | "days" => 86_400.0,
            "h" | "hr" | "hrs" | "hour" | "hours" => 3_600.0,
            "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
            "" | "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
            _ => return None,
        };
        total += value * scale;
        found = true;
    }

    found.then_some(total).filter(|t| t.is_finite())
}
