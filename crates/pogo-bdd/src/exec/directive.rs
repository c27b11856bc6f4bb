//! Directive tokenising and flag lookup.
//!
//! Directives are split on whitespace only; there is no shell quoting.

pub fn tokenize(directive: &str) -> Vec<String> {
    directive.split_whitespace().map(str::to_string).collect()
}

/// Value of `flag`, given either as `--flag value` or `--flag=value`.
/// The last occurrence wins.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let prefix = format!("{}=", flag);
    let mut found = None;
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg == flag {
            if let Some(next) = iter.peek() {
                found = Some(next.as_str());
                iter.next();
            }
        } else if let Some(value) = arg.strip_prefix(&prefix) {
            found = Some(value);
        }
    }

    found
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    let prefix = format!("{}=", flag);
    args.iter().any(|a| a == flag || a.starts_with(&prefix))
}

/// First value among several spellings of the same flag (e.g. `-o`, `--output`).
pub fn any_flag_value<'a>(args: &'a [String], flags: &[&str]) -> Option<&'a str> {
    flags.iter().find_map(|flag| flag_value(args, flag))
}
