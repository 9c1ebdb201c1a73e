//! Gateway modem serial lines
//!
//! The modem forwards every radio packet as one text line:
//!
//! ```text
//! :P:<from hex>:<to hex>:<rssi>:<byte hex> <byte hex> ...;
//! ```
//!
//! Lines starting with `#` are modem diagnostics.

use branly_core::{BranlyError, BranlyResult, NodeAddress};

/// Radio packet as received by the modem
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RadioFrame {
    pub from: NodeAddress,
    pub to: NodeAddress,
    /// Received signal strength, dBm
    pub rssi: i16,
    pub data: Vec<u8>,
}

/// One line of modem output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModemLine {
    Packet(RadioFrame),
    Debug(String),
}

impl ModemLine {
    pub fn parse(line: &str) -> BranlyResult<Self> {
        let line = line.trim();

        if let Some(text) = line.strip_prefix('#') {
            return Ok(ModemLine::Debug(text.trim().to_string()));
        }

        let body = line
            .strip_prefix(':')
            .and_then(|l| l.strip_suffix(';'))
            .filter(|b| !b.contains(';'))
            .ok_or_else(|| malformed("expected ':<data>;'", line))?;

        let mut parts = body.split(':');
        match parts.next() {
            Some("P") => {}
            Some(other) => return Err(malformed(&format!("unknown line type {other:?}"), line)),
            None => return Err(malformed("empty line", line)),
        }

        let fields: Vec<&str> = parts.collect();
        let [from, to, rssi, data] = fields.as_slice() else {
            return Err(malformed("expected 4 fields", line));
        };

        let from = u8::from_str_radix(from, 16).map_err(|_| malformed("bad source", line))?;
        let to = u8::from_str_radix(to, 16).map_err(|_| malformed("bad destination", line))?;
        let rssi = rssi
            .parse::<i16>()
            .map_err(|_| malformed("bad rssi", line))?;
        let data = data
            .split_whitespace()
            .map(|b| u8::from_str_radix(b, 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| malformed("bad payload byte", line))?;

        if data.len() < 2 {
            return Err(malformed("packet shorter than header", line));
        }

        Ok(ModemLine::Packet(RadioFrame {
            from: NodeAddress::new(from),
            to: NodeAddress::new(to),
            rssi,
            data,
        }))
    }
}

fn malformed(reason: &str, line: &str) -> BranlyError {
    BranlyError::MalformedModemLine(format!("{reason}: {line:?}"))
}
