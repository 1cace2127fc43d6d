//! XDCC request parser
//!
//! Handles the `/msg BOT xdcc send #N` notation users copy from pack lists,
//! including ranges (`#1-5`), lists (`#1,3,7`) and stepped ranges (`#1-9;2`).

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::XdccError;

/// Upper bound on the packs one expression may select
pub const MAX_PACKS: u64 = 10_000;

/// Parse a pack-number expression into an ordered, de-duplicated list
pub fn parse_pack_numbers(input: &str) -> Result<Vec<u64>, XdccError> {
    let input = input.trim().trim_start_matches('#');
    if input.is_empty() {
        return Err(XdccError::validation_error_with_field("Empty pack expression", "pack"));
    }

    let mut numbers = Vec::new();
    let mut seen = HashSet::new();
    for part in input.split(',') {
        let part = part.trim().trim_start_matches('#');
        for n in parse_part(part)? {
            if seen.insert(n) {
                numbers.push(n);
            }
        }
        if numbers.len() as u64 > MAX_PACKS {
            return Err(XdccError::validation_error_with_field(
                format!("Pack expression selects more than {} packs", MAX_PACKS),
                "pack",
            ));
        }
    }

    debug!("Pack expression '{}' -> {:?}", input, numbers);
    Ok(numbers)
}

fn parse_part(part: &str) -> Result<Vec<u64>, XdccError> {
    let (range, step) = match part.split_once(';') {
        Some((range, step)) => (range, parse_number(step)?),
        None => (part, 1),
    };

    match range.split_once('-') {
        Some((start, end)) => {
            let start = parse_number(start)?;
            let end = parse_number(end)?;
            if start > end {
                warn!("Reversed pack range {}-{}", start, end);
                return Err(XdccError::validation_error_with_field(
                    format!("Reversed pack range {}-{}", start, end),
                    "pack",
                ));
            }
            let count = (end - start) / step + 1;
            if count > MAX_PACKS {
                warn!("Pack range {}-{} selects {} packs", start, end, count);
                return Err(XdccError::validation_error_with_field(
                    format!("Pack range {}-{} selects {} packs, at most {} allowed", start, end, count, MAX_PACKS),
                    "pack",
                ));
            }
            Ok((start..=end).step_by(step as usize).collect())
        }
        None if step == 1 => Ok(vec![parse_number(range)?]),
        None => Err(XdccError::validation_error_with_field(
            format!("Step without a range in '{}'", part),
            "pack",
        )),
    }
}

fn parse_number(s: &str) -> Result<u64, XdccError> {
    let s = s.trim().trim_start_matches('#');
    match s.parse::<u64>() {
        Ok(0) => Err(XdccError::validation_error_with_field("Pack numbers start at 1", "pack")),
        Ok(n) => Ok(n),
        Err(_) => Err(XdccError::validation_error_with_field(
            format!("Invalid pack number '{}'", s),
            "pack",
        )),
    }
}

/// Parse `/msg BOT xdcc send #1-3` into the bot nick and its pack numbers
///
/// The leading `/msg` is optional and `send`/`get` are accepted in any case.
pub fn parse_xdcc_message(message: &str) -> Result<(String, Vec<u64>), XdccError> {
    let tokens: Vec<&str> = message.split_whitespace().collect();
    let tokens = match tokens.first() {
        Some(first) if first.eq_ignore_ascii_case("/msg") => &tokens[1..],
        _ => &tokens[..],
    };

    match tokens {
        [bot, xdcc, verb, rest @ ..]
            if xdcc.eq_ignore_ascii_case("xdcc")
                && (verb.eq_ignore_ascii_case("send") || verb.eq_ignore_ascii_case("get"))
                && !rest.is_empty() =>
        {
            let numbers = parse_pack_numbers(&rest.join(""))?;
            Ok((bot.to_string(), numbers))
        }
        _ => {
            warn!("Unrecognised XDCC message: {}", message);
            Err(XdccError::validation_error_with_field(
                format!("Expected '/msg <bot> xdcc send #<pack>', got '{}'", message),
                "message",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_number() {
        assert_eq!(parse_pack_numbers("5").unwrap(), vec![5]);
        assert_eq!(parse_pack_numbers("#5").unwrap(), vec![5]);
    }

    #[test]
    fn test_range_list_and_step() {
        assert_eq!(parse_pack_numbers("1-4").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(parse_pack_numbers("1,3,9").unwrap(), vec![1, 3, 9]);
        assert_eq!(parse_pack_numbers("1-10;3").unwrap(), vec![1, 4, 7, 10]);
        assert_eq!(parse_pack_numbers("#1-2,#2,5").unwrap(), vec![1, 2, 5]);
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(parse_pack_numbers("").is_err());
        assert!(parse_pack_numbers("0").is_err());
        assert!(parse_pack_numbers("5-2").is_err());
        assert!(parse_pack_numbers("1-5;0").is_err());
        assert!(parse_pack_numbers("3;2").is_err());
        assert!(parse_pack_numbers("abc").is_err());
    }

    #[test]
    fn test_oversized_ranges_rejected() {
        let err = parse_pack_numbers("1-4000000000").unwrap_err();
        assert!(matches!(err, XdccError::ValidationError { .. }));
        assert!(parse_pack_numbers("1-10001").is_err());
        assert!(parse_pack_numbers("1-6000,6001-12000").is_err());

        assert_eq!(parse_pack_numbers("1-10000").unwrap().len(), 10_000);
        assert_eq!(parse_pack_numbers("1-40000;4").unwrap().len(), 10_000);
    }

    #[test]
    fn test_parse_xdcc_message() {
        let (bot, packs) = parse_xdcc_message("/msg BOT-A xdcc send #1").unwrap();
        assert_eq!(bot, "BOT-A");
        assert_eq!(packs, vec![1]);

        let (bot, packs) = parse_xdcc_message("Ginpachi XDCC GET #10-12").unwrap();
        assert_eq!(bot, "Ginpachi");
        assert_eq!(packs, vec![10, 11, 12]);
    }

    #[test]
    fn test_parse_xdcc_message_invalid() {
        assert!(parse_xdcc_message("/msg BOT hello").is_err());
        assert!(parse_xdcc_message("/msg BOT xdcc send").is_err());
        assert!(parse_xdcc_message("").is_err());
    }
}
