// Gateway module for flag payloads
// Flags are signed `[account_id, challenge_id]` pairs; only the shape is inspected here.

mod serializer;

pub use serializer::{dumps, loads_timed_unsafe, loads_unsafe};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{FLAG_PREFIX, FLAG_SUFFIX, PRACTICE_FLAGS};

static WRAPPED_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pwn\.college\{[-.\w]+\}$").expect("valid flag pattern"));
static FLAG_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-.\w]+$").expect("valid flag pattern"));
static ANY_WRAPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+?\{(.+)\}$").expect("valid flag pattern"));

/// The body of the flag a given account would get for a given challenge
pub fn serialize_flag(account_id: i64, challenge_id: i64) -> Result<String> {
    Ok(dumps(b"", &[account_id, challenge_id])?.chars().rev().collect())
}

/// Recover `[account_id, challenge_id]` from a flag, with or without its wrapper
pub fn deserialize_flag(flag: &str) -> Option<[i64; 2]> {
    let body = ANY_WRAPPER
        .captures(flag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(flag);
    let reversed: String = body.chars().rev().collect();
    loads_unsafe::<[i64; 2]>(&reversed)
}

/// Whether the flag is one of the placeholder flags handed out in practice mode
pub fn is_practice(flag: &str) -> bool {
    PRACTICE_FLAGS.contains(&flag)
}

/// Wrap a flag body in `pwn.college{...}`
pub fn wrap(body: &str) -> String {
    format!("{}{}{}", FLAG_PREFIX, body, FLAG_SUFFIX)
}

/// Length of the submitted flag when it looks like a flag at all
pub fn submitted_length(flag: &str) -> Option<usize> {
    if WRAPPED_FLAG.is_match(flag) {
        Some(flag.len())
    } else if FLAG_BODY.is_match(flag) {
        Some(wrap(flag).len())
    } else {
        None
    }
}

/// True unless the flag has a recognisable shape and the wrong length
pub fn check_length(flag: &str, expected: usize) -> bool {
    submitted_length(flag).map_or(true, |len| len == expected)
}

/// What can be said about a flag without knowing it
#[derive(Debug, Clone, PartialEq)]
pub struct FlagShape {
    pub prefix: String,
    pub suffix: String,
    pub alphabet: String,
    /// Length of the wrapped flag, excluding any newline
    pub length: usize,
    /// Characters between the prefix and the suffix
    pub middle: usize,
}

impl FlagShape {
    /// Estimate the flag shape from the account and challenge ids
    pub fn estimate(account_id: i64, challenge_id: i64) -> Result<Self> {
        let body = serialize_flag(account_id, challenge_id)?;
        let dot = body.find('.').unwrap_or(body.len());
        Ok(Self {
            prefix: FLAG_PREFIX.to_string(),
            suffix: format!("{}{}", &body[dot..], FLAG_SUFFIX),
            alphabet: flag_alphabet(),
            length: wrap(&body).len(),
            middle: dot,
        })
    }

    /// Replace the estimate with the size of the real flag file
    ///
    /// `file_size` includes the trailing newline.
    pub fn measured(mut self, file_size: u64) -> Self {
        let length = (file_size as usize).saturating_sub(1);
        self.length = length;
        self.middle = length.saturating_sub(self.prefix.len() + self.suffix.len());
        self
    }
}

/// Characters that may appear in the signed middle of a flag, in sorted order
pub fn flag_alphabet() -> String {
    let mut chars: Vec<char> = ('0'..='9')
        .chain('a'..='z')
        .chain('A'..='Z')
        .chain(['-', '_'])
        .collect();
    chars.sort_unstable();
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialize_known_flags() {
        assert_eq!(serialize_flag(1, 2).unwrap(), "YsJQmayAZxb5MoMIIfkD53c5wdf.0lMsEzW");
        assert_eq!(
            serialize_flag(123456, 789).unwrap(),
            "07Prx242cseOwx8yebWe764RQd-.dlDO3wiN1QzMyEzW"
        );
    }

    #[test]
    fn test_deserialize_wrapped_and_bare() {
        assert_eq!(
            deserialize_flag("pwn.college{YsJQmayAZxb5MoMIIfkD53c5wdf.0lMsEzW}"),
            Some([1, 2])
        );
        assert_eq!(
            deserialize_flag("07Prx242cseOwx8yebWe764RQd-.dlDO3wiN1QzMyEzW"),
            Some([123456, 789])
        );
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert_eq!(deserialize_flag("pwn.college{practice}"), None);
        assert_eq!(deserialize_flag("not a flag"), None);
        assert_eq!(deserialize_flag(""), None);
    }

    #[test]
    fn test_practice_flags() {
        assert!(is_practice("practice"));
        assert!(is_practice("pwn.college{practice}"));
        assert!(!is_practice("pwn.college{YsJQmayAZxb5MoMIIfkD53c5wdf.0lMsEzW}"));
    }

    #[test]
    fn test_check_length() {
        let body = "YsJQmayAZxb5MoMIIfkD53c5wdf.0lMsEzW";
        let expected = wrap(body).len();
        assert!(check_length(&wrap(body), expected));
        assert!(check_length(body, expected));
        assert!(!check_length(&wrap(body), expected + 1));
        assert!(!check_length("short", expected));
        // unrecognisable input is left to the server
        assert!(check_length("has spaces in it", expected));
    }

    #[test]
    fn test_estimated_shape() {
        let shape = FlagShape::estimate(1, 2).unwrap();
        assert_eq!(shape.prefix, "pwn.college{");
        assert_eq!(shape.suffix, ".0lMsEzW}");
        assert_eq!(shape.middle, 27);
        assert_eq!(shape.length, "pwn.college{YsJQmayAZxb5MoMIIfkD53c5wdf.0lMsEzW}".len());
    }

    #[test]
    fn test_measured_shape() {
        let shape = FlagShape::estimate(1, 2).unwrap().measured(60);
        assert_eq!(shape.length, 59);
        assert_eq!(shape.middle, 59 - 12 - 9);
    }

    #[test]
    fn test_alphabet_is_sorted() {
        let alphabet = flag_alphabet();
        assert_eq!(alphabet.len(), 64);
        assert!(alphabet.starts_with("-0123456789ABC"));
        assert!(alphabet.ends_with("_abcdefghijklmnopqrstuvwxyz"));
    }
}
