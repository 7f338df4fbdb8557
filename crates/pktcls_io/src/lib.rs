//! Ingestion adapters for the pktcls rule and trace file formats: the
//! Classbench range-rule format, the prefix-rule format, and the packet
//! trace format. Parsing is line oriented; any syntactic mismatch, an
//! unsupported protocol mask, or an overflow of the fixed capacity caps is
//! fatal with a diagnostic naming the file and line.

mod classbench;
pub mod error;

use std::{fs, path::Path};

use pktcls_core::rule::{Packet, PrefixRule, RangeRule};

pub use error::{Error, Result};

/// Capacity cap for rule sets.
pub const RULE_MAX: usize = 1 << 20;
/// Capacity cap for traces.
pub const PKT_MAX: usize = 1 << 20;

/// A record parsed from one line of an input file.
pub trait LineRecord: Sized {
    /// Capacity cap for files of this record kind.
    const CAP: usize;

    /// Parse a single non-empty line.
    fn parse_line(input: &str) -> std::result::Result<Self, error::LineError>;
}

/// Parse every non-empty line of `content` as a record of type `R`.
///
/// `origin` only labels diagnostics; use [`load`] to read from a file.
pub fn parse<R: LineRecord>(content: &str, origin: impl AsRef<Path>) -> Result<Vec<R>> {
    parse_capped(content, R::CAP, origin.as_ref())
}

/// Load a record file from `path`.
pub fn load<R: LineRecord>(path: impl AsRef<Path>) -> Result<Vec<R>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    parse_capped(&content, R::CAP, path)
}

fn parse_capped<R: LineRecord>(content: &str, cap: usize, path: &Path) -> Result<Vec<R>> {
    let mut records = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if records.len() >= cap {
            return Err(Error::CapacityExceeded {
                path: path.to_path_buf(),
                cap,
            });
        }
        let record = R::parse_line(line).map_err(|e| match e {
            error::LineError::ProtoMask(mask) => Error::UnsupportedMask {
                path: path.to_path_buf(),
                line: idx + 1,
                mask,
            },
            other => Error::ParseFormat {
                path: path.to_path_buf(),
                line: idx + 1,
                detail: other.to_string(),
            },
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Load a Classbench range-format rule file.
pub fn load_range_rules(path: impl AsRef<Path>) -> Result<Vec<RangeRule>> {
    let path = path.as_ref();
    log::info!("loading range rules from {}", path.display());
    let rules = load::<RangeRule>(path)?;
    log::info!("{} rules loaded", rules.len());
    Ok(rules)
}

/// Load a prefix-format rule file.
pub fn load_prefix_rules(path: impl AsRef<Path>) -> Result<Vec<PrefixRule>> {
    let path = path.as_ref();
    log::info!("loading prefix rules from {}", path.display());
    let rules = load::<PrefixRule>(path)?;
    log::info!("{} rules loaded", rules.len());
    Ok(rules)
}

/// Load a packet trace file.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<Packet>> {
    let path = path.as_ref();
    log::info!("loading trace from {}", path.display());
    let pkts = load::<Packet>(path)?;
    log::info!("{} packets loaded", pkts.len());
    Ok(pkts)
}

/// Basics for io
pub mod basic {
    /// Basic helper functions for parsing
    pub mod parser {
        use nom::character::complete::{char, digit1, hex_digit1};
        use nom::error::{ErrorKind, ParseError};
        use nom::sequence::tuple;
        use nom::Err::Error;
        use nom::IResult;

        /// r"[<=255].[<=255].[<=255].[<=255]"
        pub fn parse_ipv4_dotted<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            fn parse_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
                let (rest, num) = digit1(input)?;
                if let Ok(num) = num.parse::<u8>() {
                    Ok((rest, num))
                } else {
                    Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
                }
            }

            let (rest, (o1, _, o2, _, o3, _, o4)) = tuple((
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
            ))(input)?;
            Ok((
                rest,
                (o1 as u32) << 24 | (o2 as u32) << 16 | (o3 as u32) << 8 | o4 as u32,
            ))
        }

        /// r"[<=u32::MAX]"
        pub fn parse_u32<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u32, E> {
            let (rest, num) = digit1(input)?;
            if let Ok(num) = num.parse::<u32>() {
                Ok((rest, num))
            } else {
                Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
            }
        }

        /// One hex byte, r"[0-9a-fA-F]{1,2}"
        pub fn parse_hex_byte<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u8, E> {
            let (rest, num) = hex_digit1(input)?;
            if num.len() <= 2 {
                if let Ok(num) = u8::from_str_radix(num, 16) {
                    return Ok((rest, num));
                }
            }
            Err(Error(E::from_error_kind(input, ErrorKind::HexDigit)))
        }
    }
}
