//! Line grammars for the three input formats.
//!
//! Range rule (Classbench):
//! `@A.B.C.D/m E.F.G.H/m lo : hi lo : hi PP/MM id`
//!
//! Prefix rule:
//! `@A.B.C.D/m E.F.G.H/m sport/len dport/len PP/MM id`
//!
//! Trace packet:
//! `SIP DIP SPORT DPORT PROTO id` (all decimal)
//!
//! `PP`/`MM` are hex bytes; the only accepted protocol masks are `FF`
//! (exact) and `00` (wildcard). Rule ids are 1-based; priority = id - 1.

use nom::{
    character::complete::{char, multispace0, multispace1},
    combinator::all_consuming,
    error::Error as NomError,
    sequence::{delimited, separated_pair, terminated, tuple},
    IResult,
};

use pktcls_core::{
    dim::{prefix_mask, Dim, DimRange, DIM_NUM},
    rule::{Packet, PrefixRule, RangeRule},
};

use crate::{
    basic::parser::{parse_hex_byte, parse_ipv4_dotted, parse_u32},
    error::LineError,
    LineRecord, PKT_MAX, RULE_MAX,
};

/// `A.B.C.D/m`, prefix length clamped to 32.
fn parse_ipv4_prefix(input: &str) -> IResult<&str, (u32, u8), NomError<&str>> {
    let (rest, (ip, m)) = separated_pair(parse_ipv4_dotted, char('/'), parse_u32)(input)?;
    Ok((rest, (ip, m.min(32) as u8)))
}

/// `lo : hi`
fn parse_port_range(input: &str) -> IResult<&str, (u32, u32), NomError<&str>> {
    separated_pair(
        parse_u32,
        delimited(multispace0, char(':'), multispace0),
        parse_u32,
    )(input)
}

/// `PP/MM`
fn parse_proto_pair(input: &str) -> IResult<&str, (u8, u8), NomError<&str>> {
    separated_pair(parse_hex_byte, char('/'), parse_hex_byte)(input)
}

/// `value/len`
fn parse_slash_pair(input: &str) -> IResult<&str, (u32, u32), NomError<&str>> {
    separated_pair(parse_u32, char('/'), parse_u32)(input)
}

fn priority_from_id(id: u32) -> Result<u32, LineError> {
    id.checked_sub(1).ok_or(LineError::RuleId)
}

fn proto_range(proto: u8, mask: u8) -> Result<DimRange, LineError> {
    match mask {
        0xff => Ok(DimRange::point(proto as u32)),
        0x00 => Ok(DimRange::full(Dim::Proto)),
        other => Err(LineError::ProtoMask(other)),
    }
}

fn ip_range(ip: u32, len: u8) -> DimRange {
    let mask = prefix_mask(32, len);
    DimRange {
        low: ip & mask,
        high: ip | !mask,
    }
}

fn port_range(lo: u32, hi: u32) -> DimRange {
    let (lo, hi) = (lo & 0xffff, hi & 0xffff);
    if lo <= hi {
        DimRange { low: lo, high: hi }
    } else {
        DimRange { low: hi, high: lo }
    }
}

impl LineRecord for RangeRule {
    const CAP: usize = RULE_MAX;

    fn parse_line(input: &str) -> Result<Self, LineError> {
        let (_, (_, sip, _, dip, _, sports, _, dports, _, (proto, proto_mask), _, id)) =
            all_consuming(terminated(
                tuple((
                    char('@'),
                    parse_ipv4_prefix,
                    multispace1,
                    parse_ipv4_prefix,
                    multispace1,
                    parse_port_range,
                    multispace1,
                    parse_port_range,
                    multispace1,
                    parse_proto_pair,
                    multispace1,
                    parse_u32,
                )),
                multispace0,
            ))(input)
            .map_err(|_: nom::Err<NomError<&str>>| LineError::Syntax)?;

        let mut dims = [DimRange { low: 0, high: 0 }; DIM_NUM];
        dims[Dim::Sip.index()] = ip_range(sip.0, sip.1);
        dims[Dim::Dip.index()] = ip_range(dip.0, dip.1);
        dims[Dim::Sport.index()] = port_range(sports.0, sports.1);
        dims[Dim::Dport.index()] = port_range(dports.0, dports.1);
        dims[Dim::Proto.index()] = proto_range(proto, proto_mask)?;

        Ok(RangeRule {
            dims,
            priority: priority_from_id(id)?,
        })
    }
}

impl LineRecord for PrefixRule {
    const CAP: usize = RULE_MAX;

    fn parse_line(input: &str) -> Result<Self, LineError> {
        let (_, (_, sip, _, dip, _, sport, _, dport, _, (proto, proto_mask), _, id)) =
            all_consuming(terminated(
                tuple((
                    char('@'),
                    parse_ipv4_prefix,
                    multispace1,
                    parse_ipv4_prefix,
                    multispace1,
                    parse_slash_pair,
                    multispace1,
                    parse_slash_pair,
                    multispace1,
                    parse_proto_pair,
                    multispace1,
                    parse_u32,
                )),
                multispace0,
            ))(input)
            .map_err(|_: nom::Err<NomError<&str>>| LineError::Syntax)?;

        let mut value = [0u32; DIM_NUM];
        let mut len = [0u8; DIM_NUM];

        value[Dim::Sip.index()] = sip.0 & prefix_mask(32, sip.1);
        len[Dim::Sip.index()] = sip.1;
        value[Dim::Dip.index()] = dip.0 & prefix_mask(32, dip.1);
        len[Dim::Dip.index()] = dip.1;

        for (dim, (v, l)) in [(Dim::Sport, sport), (Dim::Dport, dport)] {
            if l > 16 {
                return Err(LineError::PortLen(l));
            }
            value[dim.index()] = v & prefix_mask(16, l as u8);
            len[dim.index()] = l as u8;
        }

        match proto_mask {
            0xff => {
                value[Dim::Proto.index()] = proto as u32;
                len[Dim::Proto.index()] = 8;
            }
            0x00 => {}
            other => return Err(LineError::ProtoMask(other)),
        }

        Ok(PrefixRule {
            value,
            len,
            priority: priority_from_id(id)?,
        })
    }
}

impl LineRecord for Packet {
    const CAP: usize = PKT_MAX;

    fn parse_line(input: &str) -> Result<Self, LineError> {
        let (_, (sip, _, dip, _, sport, _, dport, _, proto, _, id)) = all_consuming(terminated(
            tuple((
                parse_u32,
                multispace1,
                parse_u32,
                multispace1,
                parse_u32,
                multispace1,
                parse_u32,
                multispace1,
                parse_u32,
                multispace1,
                parse_u32,
            )),
            multispace0,
        ))(input)
        .map_err(|_: nom::Err<NomError<&str>>| LineError::Syntax)?;

        Ok(Packet::with_expected(
            [sip, dip, sport & 0xffff, dport & 0xffff, proto & 0xff],
            id.checked_sub(1),
        ))
    }
}
