use crate::error::IngestError;
use korr_core::headers::{Ipv4Header, TcpFlags, TcpHeader, Transport, UdpHeader, PROTO_TCP, PROTO_UDP};
use korr_core::{Alert, AlertTypeKey};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while1, take_while_m_n};
use nom::character::complete::{char, digit1, hex_digit1, space0, space1};
use nom::combinator::{map_res, opt};
use nom::sequence::tuple;
use nom::IResult;
use std::net::Ipv4Addr;

/// `[**] [gid:sid:rev] desc [**]` (spec.md §4.2's header line shape).
fn header_line(input: &str) -> IResult<&str, (u32, u32, u32, String)> {
    let (input, _) = tag("[**]")(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('[')(input)?;
    let (input, gid) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char(':')(input)?;
    let (input, sid) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char(':')(input)?;
    let (input, rev) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char(']')(input)?;
    let (input, _) = space0(input)?;
    let (input, desc) = take_until("[**]")(input)?;
    let (input, _) = tag("[**]")(input)?;
    Ok((input, (gid, sid, rev, desc.trim().to_string())))
}

pub fn parse_header(line: &str) -> Option<(u32, u32, u32, String)> {
    header_line(line.trim()).ok().map(|(_, v)| v)
}

fn find_bracketed<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start_tag = format!("[{key}:");
    let start = line.find(&start_tag)? + start_tag.len();
    let rest = &line[start..];
    let end = rest.find(']')?;
    Some(rest[..end].trim())
}

/// `[Priority: N]`, optionally sharing a line with `[Classification: text]`.
pub fn parse_priority_classification(line: &str) -> Option<(u32, Option<String>)> {
    let priority = find_bracketed(line, "Priority")?.parse().ok()?;
    let classification = find_bracketed(line, "Classification").map(ToString::to_string);
    Some((priority, classification))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub day: u32,
    pub month: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
}

fn date_time(input: &str) -> IResult<&str, (u32, u32, u32, u32, u32)> {
    let (input, day) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char('/')(input)?;
    let (input, month) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char('-')(input)?;
    let (input, hour) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char(':')(input)?;
    let (input, min) = map_res(digit1, str::parse)(input)?;
    let (input, _) = char(':')(input)?;
    let (input, sec) = map_res(digit1, str::parse)(input)?;
    let (input, _) = opt(tuple((char('.'), digit1)))(input)?;
    Ok((input, (day, month, hour, min, sec)))
}

fn ipv4(input: &str) -> IResult<&str, Ipv4Addr> {
    map_res(take_while1(|c: char| c.is_ascii_digit() || c == '.'), |s: &str| s.parse())(input)
}

fn endpoints_with_ports(input: &str) -> IResult<&str, Endpoints> {
    let (input, (day, month, hour, min, sec)) = date_time(input)?;
    let (input, _) = space1(input)?;
    let (input, src_ip) = ipv4(input)?;
    let (input, _) = char(':')(input)?;
    let (input, src_port) = map_res(digit1, str::parse)(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("->")(input)?;
    let (input, _) = space0(input)?;
    let (input, dst_ip) = ipv4(input)?;
    let (input, _) = char(':')(input)?;
    let (input, dst_port) = map_res(digit1, str::parse)(input)?;
    Ok((
        input,
        Endpoints {
            day,
            month,
            hour,
            min,
            sec,
            src_ip,
            dst_ip,
            src_port: Some(src_port),
            dst_port: Some(dst_port),
        },
    ))
}

fn endpoints_without_ports(input: &str) -> IResult<&str, Endpoints> {
    let (input, (day, month, hour, min, sec)) = date_time(input)?;
    let (input, _) = space1(input)?;
    let (input, src_ip) = ipv4(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("->")(input)?;
    let (input, _) = space0(input)?;
    let (input, dst_ip) = ipv4(input)?;
    Ok((
        input,
        Endpoints {
            day,
            month,
            hour,
            min,
            sec,
            src_ip,
            dst_ip,
            src_port: None,
            dst_port: None,
        },
    ))
}

pub fn parse_endpoints(line: &str) -> Option<Endpoints> {
    alt((endpoints_with_ports, endpoints_without_ports))(line.trim())
        .ok()
        .map(|(_, v)| v)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpHeaderPart {
    pub proto: String,
    pub ttl: u8,
    pub tos: u8,
    pub id: u16,
    pub iplen: u16,
}

fn ip_header_line(input: &str) -> IResult<&str, IpHeaderPart> {
    let (input, proto) = take_while1(|c: char| c.is_ascii_alphabetic())(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("TTL:")(input)?;
    let (input, _) = space0(input)?;
    let (input, ttl) = map_res(digit1, str::parse)(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("TOS:0x")(input)?;
    let (input, tos) = map_res(hex_digit1, |s| u8::from_str_radix(s, 16))(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("ID:")(input)?;
    let (input, _) = space0(input)?;
    let (input, id) = map_res(digit1, str::parse)(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("IpLen:")(input)?;
    let (input, _) = space0(input)?;
    let (input, iplen) = map_res(digit1, str::parse)(input)?;

    Ok((
        input,
        IpHeaderPart {
            proto: proto.to_ascii_lowercase(),
            ttl,
            tos,
            id,
            iplen,
        },
    ))
}

pub fn parse_ip_header(line: &str) -> Option<IpHeaderPart> {
    ip_header_line(line.trim()).ok().map(|(_, v)| v)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeaderPart {
    pub flags: String,
    pub seq: u32,
    pub ack: u32,
    pub window: u16,
    pub tcplen: u16,
}

fn tcp_header_line(input: &str) -> IResult<&str, TcpHeaderPart> {
    let (input, flags) = take_while_m_n(8, 8, |c: char| "*UAPRSFCE".contains(c))(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("Seq:")(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("0x")(input)?;
    let (input, seq) = map_res(hex_digit1, |s| u32::from_str_radix(s, 16))(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("Ack:")(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("0x")(input)?;
    let (input, ack) = map_res(hex_digit1, |s| u32::from_str_radix(s, 16))(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("Win:")(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("0x")(input)?;
    let (input, window) = map_res(hex_digit1, |s| u16::from_str_radix(s, 16))(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("TcpLen:")(input)?;
    let (input, _) = space0(input)?;
    let (input, tcplen) = map_res(digit1, str::parse)(input)?;

    Ok((
        input,
        TcpHeaderPart {
            flags: flags.to_string(),
            seq,
            ack,
            window,
            tcplen,
        },
    ))
}

pub fn parse_tcp_header(line: &str) -> Option<TcpHeaderPart> {
    tcp_header_line(line.trim()).ok().map(|(_, v)| v)
}

fn flags_to_bitmask(flags: &str) -> TcpFlags {
    let mut bits = 0u8;
    for c in flags.chars() {
        bits |= match c {
            'F' => korr_core::headers::tcp_flag::FIN,
            'S' => korr_core::headers::tcp_flag::SYN,
            'R' => korr_core::headers::tcp_flag::RST,
            'P' => korr_core::headers::tcp_flag::PSH,
            'A' => korr_core::headers::tcp_flag::ACK,
            'U' => korr_core::headers::tcp_flag::URG,
            _ => 0,
        };
    }
    TcpFlags(bits)
}

/// A supplemental raw-payload dump line, e.g.
/// `0x0000: 45 00 00 3C 1C 46 40 00 ...`. Lenient: any two-hex-digit
/// token up to the first non-hex token (the ASCII rendering column) is
/// collected as a payload byte.
pub fn parse_payload_line(line: &str) -> Option<Vec<u8>> {
    let trimmed = line.trim();
    if !trimmed.starts_with("0x") {
        return None;
    }
    let after_colon = trimmed.splitn(2, ':').nth(1)?;
    let mut bytes = Vec::new();
    for tok in after_colon.split_whitespace() {
        if tok.len() == 2 && tok.chars().all(|c| c.is_ascii_hexdigit()) {
            bytes.push(u8::from_str_radix(tok, 16).ok()?);
        } else {
            break;
        }
    }
    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}

/// Accumulates one alert record across lines between blank-line
/// separators. Creation requires a successful header-line parse (fatal
/// otherwise, per spec.md §4.2); every other field defaults to zero if
/// its line shape never shows up, per the "isolated unknown fields
/// default to zero" contract clause.
#[derive(Debug)]
pub struct RecordBuilder {
    type_key: AlertTypeKey,
    description: String,
    priority: u32,
    classification: Option<String>,
    endpoints: Option<Endpoints>,
    ip_header: Option<IpHeaderPart>,
    tcp_header: Option<TcpHeaderPart>,
    payload: Vec<u8>,
}

impl RecordBuilder {
    pub fn start(line: &str) -> Result<Self, IngestError> {
        let (gid, sid, rev, desc) = parse_header(line).ok_or_else(|| IngestError::Malformed {
            reason: format!("line does not open a new alert record: {line:?}"),
        })?;
        Ok(Self {
            type_key: AlertTypeKey::new(gid, sid, rev),
            description: desc,
            priority: 0,
            classification: None,
            endpoints: None,
            ip_header: None,
            tcp_header: None,
            payload: Vec::new(),
        })
    }

    /// Try every remaining line shape against `line`. Unmatched lines are
    /// ignored (a lenient else-if chain, not a fatal parse error).
    pub fn feed(&mut self, line: &str) {
        if let Some((priority, classification)) = parse_priority_classification(line) {
            self.priority = priority;
            if classification.is_some() {
                self.classification = classification;
            }
            return;
        }
        if let Some(endpoints) = parse_endpoints(line) {
            self.endpoints = Some(endpoints);
            return;
        }
        if let Some(ip_header) = parse_ip_header(line) {
            self.ip_header = Some(ip_header);
            return;
        }
        if let Some(tcp_header) = parse_tcp_header(line) {
            self.tcp_header = Some(tcp_header);
            return;
        }
        if let Some(mut bytes) = parse_payload_line(line) {
            self.payload.append(&mut bytes);
        }
    }

    /// Finalize into an [`Alert`]. `year` supplies the calendar year the
    /// log's day/month/time fields are interpreted against, since the
    /// text format carries no year of its own — callers pass the current
    /// wall-clock year at parse time.
    pub fn finish(self, year: i32) -> Alert {
        let timestamp = self
            .endpoints
            .as_ref()
            .and_then(|e| {
                chrono::NaiveDate::from_ymd_opt(year, e.month, e.day)
                    .and_then(|d| d.and_hms_opt(e.hour, e.min, e.sec))
            })
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let src = self.endpoints.as_ref().map(|e| e.src_ip).unwrap_or(Ipv4Addr::UNSPECIFIED);
        let dst = self.endpoints.as_ref().map(|e| e.dst_ip).unwrap_or(Ipv4Addr::UNSPECIFIED);
        let src_port = self.endpoints.as_ref().and_then(|e| e.src_port).unwrap_or(0);
        let dst_port = self.endpoints.as_ref().and_then(|e| e.dst_port).unwrap_or(0);

        let (protocol, transport) = match (&self.ip_header, &self.tcp_header) {
            (Some(ip), Some(tcp)) if ip.proto == "tcp" => (
                PROTO_TCP,
                Transport::Tcp(TcpHeader {
                    src_port,
                    dst_port,
                    seq: tcp.seq,
                    ack: tcp.ack,
                    flags: flags_to_bitmask(&tcp.flags),
                    window: tcp.window,
                    length: tcp.tcplen,
                }),
            ),
            (Some(ip), _) if ip.proto == "udp" => (
                PROTO_UDP,
                Transport::Udp(UdpHeader {
                    src_port,
                    dst_port,
                    length: ip.iplen,
                }),
            ),
            _ => (0, Transport::Other),
        };

        let ip = Ipv4Header {
            tos: self.ip_header.as_ref().map(|h| h.tos).unwrap_or(0),
            total_length: self.ip_header.as_ref().map(|h| h.iplen).unwrap_or(0),
            id: self.ip_header.as_ref().map(|h| h.id).unwrap_or(0),
            ttl: self.ip_header.as_ref().map(|h| h.ttl).unwrap_or(0),
            protocol,
            src,
            dst,
        };

        let mut alert = Alert::new(self.type_key, self.priority, timestamp, ip, transport);
        alert.description = Some(self.description).filter(|d| !d.is_empty());
        alert.classification = self.classification;
        alert.payload = self.payload;
        alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_line() {
        let (gid, sid, rev, desc) = parse_header("[**] [1:1000:1] SCAN nmap TCP [**]").unwrap();
        assert_eq!((gid, sid, rev), (1, 1000, 1));
        assert_eq!(desc, "SCAN nmap TCP");
    }

    #[test]
    fn parses_priority_and_classification_in_either_order() {
        let (priority, classification) =
            parse_priority_classification("[Classification: Attempted Recon] [Priority: 2]").unwrap();
        assert_eq!(priority, 2);
        assert_eq!(classification.as_deref(), Some("Attempted Recon"));
    }

    #[test]
    fn parses_endpoints_with_ports() {
        let e = parse_endpoints("07/14-12:34:56.789012 10.0.0.1:4444 -> 10.0.0.2:80").unwrap();
        assert_eq!(e.src_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(e.dst_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(e.src_port, Some(4444));
        assert_eq!(e.dst_port, Some(80));
    }

    #[test]
    fn parses_endpoints_without_ports() {
        let e = parse_endpoints("07/14-12:34:56.789012 10.0.0.1 -> 10.0.0.2").unwrap();
        assert_eq!(e.src_port, None);
        assert_eq!(e.dst_port, None);
    }

    #[test]
    fn parses_ip_header_line() {
        let ip = parse_ip_header("TCP TTL:64 TOS:0x0 ID:4321 IpLen:20 DgmLen:60").unwrap();
        assert_eq!(ip.proto, "tcp");
        assert_eq!(ip.ttl, 64);
        assert_eq!(ip.id, 4321);
        assert_eq!(ip.iplen, 20);
    }

    #[test]
    fn parses_tcp_header_line() {
        let tcp = parse_tcp_header("***A**S* Seq: 0x1A2B3C4D  Ack: 0x0  Win: 0x2000  TcpLen: 20").unwrap();
        assert_eq!(tcp.seq, 0x1A2B3C4D);
        assert_eq!(tcp.window, 0x2000);
        assert!(flags_to_bitmask(&tcp.flags).has(korr_core::headers::tcp_flag::SYN));
        assert!(flags_to_bitmask(&tcp.flags).has(korr_core::headers::tcp_flag::ACK));
    }

    #[test]
    fn parses_payload_hex_dump_line() {
        let bytes = parse_payload_line("0x0000: 45 00 00 3C AB  E..<.").unwrap();
        assert_eq!(bytes, vec![0x45, 0x00, 0x00, 0x3C, 0xAB]);
    }

    #[test]
    fn record_builder_defaults_missing_fields_to_zero() {
        let builder = RecordBuilder::start("[**] [1:1000:1] probe [**]").unwrap();
        let alert = builder.finish(2024);
        assert_eq!(alert.priority, 0);
        assert_eq!(alert.timestamp, 0);
        assert!(!alert.is_tcp());
    }

    #[test]
    fn record_builder_assembles_a_full_tcp_record() {
        let mut builder = RecordBuilder::start("[**] [1:1000:1] SCAN nmap TCP [**]").unwrap();
        builder.feed("[Classification: Attempted Recon] [Priority: 2]");
        builder.feed("07/14-12:34:56.789012 10.0.0.1:4444 -> 10.0.0.2:80");
        builder.feed("TCP TTL:64 TOS:0x0 ID:4321 IpLen:20 DgmLen:60");
        builder.feed("***A**S* Seq: 0x1  Ack: 0x0  Win: 0x2000  TcpLen: 20");
        let alert = builder.finish(2024);

        assert_eq!(alert.priority, 2);
        assert_eq!(alert.classification.as_deref(), Some("Attempted Recon"));
        assert_eq!(alert.ip.src, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(alert.src_port(), Some(4444));
        assert!(alert.is_tcp());
    }

    #[test]
    fn starting_from_a_non_header_line_is_an_error() {
        assert!(RecordBuilder::start("not a header line").is_err());
    }
}
