//! Command-line arguments as a configuration layer.
//!
//! A small flag tokenizer in the spirit of `minimist`: every `--key` becomes
//! a configuration key, `/` or `.` inside a key nests it, and values are
//! inferred as booleans, numbers or strings. Positional arguments are not
//! configuration and are dropped.

use serde_json::Number;

use crate::value::{ConfigValue, KeyPath, Scalar};

/// Parses the process arguments, skipping the program name.
pub fn from_process() -> ConfigValue {
    parse(std::env::args().skip(1))
}

/// Parses `args` into a mapping.
///
/// Supported forms: `--key=value`, `--key value`, `--flag`, `--no-flag`,
/// `-abc` (each letter a `true` flag), `-k value` and `--` to stop. A key
/// given more than once collects its values into a sequence.
pub fn parse<I, S>(args: I) -> ConfigValue
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let mut parsed = ConfigValue::empty();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        let next = args.get(i + 1).map(String::as_str).filter(|n| is_value(n));

        if arg == "--" {
            break;
        }

        if let Some(body) = arg.strip_prefix("--") {
            if let Some((key, value)) = body.split_once('=') {
                assign(&mut parsed, key, infer(value));
            } else if let Some(key) = body.strip_prefix("no-") {
                assign(&mut parsed, key, ConfigValue::from(false));
            } else if let Some(value) = next {
                assign(&mut parsed, body, infer(value));
                i += 1;
            } else {
                assign(&mut parsed, body, ConfigValue::from(true));
            }
        } else if let Some(flags) = arg
            .strip_prefix('-')
            .filter(|flags| !flags.is_empty() && !looks_numeric(arg))
        {
            i += parse_short_flags(&mut parsed, flags, next);
        }

        i += 1;
    }

    parsed
}

/// Handles a `-abc` cluster, returning how many extra arguments were used.
fn parse_short_flags(parsed: &mut ConfigValue, flags: &str, next: Option<&str>) -> usize {
    if let Some((key, value)) = flags.split_once('=') {
        assign(parsed, key, infer(value));
        return 0;
    }

    let mut letters: Vec<String> = flags.chars().map(String::from).collect();
    let Some(last) = letters.pop() else {
        return 0;
    };

    for letter in letters {
        assign(parsed, &letter, ConfigValue::from(true));
    }

    match next {
        Some(value) => {
            assign(parsed, &last, infer(value));
            1
        }
        None => {
            assign(parsed, &last, ConfigValue::from(true));
            0
        }
    }
}

/// True if `arg` can be consumed as a flag's value.
fn is_value(arg: &str) -> bool {
    !arg.starts_with('-') || looks_numeric(arg)
}

fn assign(parsed: &mut ConfigValue, key: &str, value: ConfigValue) {
    let path = KeyPath::parse(key);
    if path.is_empty() {
        return;
    }

    let combined = match parsed.navigate(&path) {
        Ok(ConfigValue::Sequence(existing)) => {
            let mut items = existing.clone();
            items.push(value);
            ConfigValue::Sequence(items)
        }
        Ok(existing) => ConfigValue::Sequence(vec![existing.clone(), value]),
        Err(_) => value,
    };

    parsed.set_at_path(&path, combined);
}

/// Infers a scalar type from a raw argument.
pub fn infer(raw: &str) -> ConfigValue {
    match raw {
        "true" => return ConfigValue::from(true),
        "false" => return ConfigValue::from(false),
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return ConfigValue::from(int);
    }

    if looks_numeric(raw) {
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return ConfigValue::Scalar(Scalar::Number(number));
        }
    }

    ConfigValue::string(raw)
}

fn looks_numeric(raw: &str) -> bool {
    !raw.is_empty()
        && raw.chars().any(|c| c.is_ascii_digit())
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && raw.parse::<f64>().is_ok()
}
