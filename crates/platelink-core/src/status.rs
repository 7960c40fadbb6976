//! Device status and device error values.
//!
//! A plate shuttle answers state-changing commands with either `ok <hex>`
//! or `er <code>`. This module gives both payloads a typed form:
//!
//! - [`DeviceStatus`] -- the fixed-width hex status word from an `ok` reply
//! - [`DeviceError`] -- the numeric fault code from an `er` reply
//!
//! What the individual status bits or error codes *mean* is device data,
//! not protocol logic. Callers that ship a code table plug it in through
//! [`ErrorCodeTable`].

use std::fmt;
use std::str::FromStr;

/// Status word decoded from the hex payload of an `ok` reply.
///
/// The number of hex digits the device sent is preserved so the value
/// renders back exactly as it was received (`"05"` stays `"05"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceStatus {
    bits: u32,
    digits: u8,
}

impl DeviceStatus {
    /// Widest status payload accepted, in hex digits.
    pub const MAX_DIGITS: usize = 8;

    /// Build a status from its raw bits, rendered with `digits` hex digits.
    ///
    /// `digits` is clamped to `1..=8`.
    pub fn new(bits: u32, digits: u8) -> Self {
        DeviceStatus {
            bits,
            digits: digits.clamp(1, Self::MAX_DIGITS as u8),
        }
    }

    /// Parse a status from a hex string such as `"05"` or `" 1A "`.
    pub fn from_hex_str(s: &str) -> Result<Self, ParseStatusError> {
        let hex = s.trim();
        let fail = |reason| ParseStatusError {
            input: s.to_string(),
            reason,
        };

        if hex.is_empty() {
            return Err(fail("empty status"));
        }
        if hex.len() > Self::MAX_DIGITS {
            return Err(fail("status wider than 8 hex digits"));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(fail("status is not hexadecimal"));
        }

        let bits = u32::from_str_radix(hex, 16).map_err(|_| fail("status is not hexadecimal"))?;
        Ok(DeviceStatus {
            bits,
            digits: hex.len() as u8,
        })
    }

    /// The raw status word.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of hex digits the status was reported with.
    pub fn digits(&self) -> u8 {
        self.digits
    }

    /// Whether bit `n` (0 = least significant) is set.
    pub fn bit(&self, n: u32) -> bool {
        n < u32::BITS && self.bits & (1 << n) != 0
    }

    /// True when no status bit is set.
    pub fn is_clear(&self) -> bool {
        self.bits == 0
    }
}

impl FromStr for DeviceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_str(s)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$X}", self.bits, width = self.digits as usize)
    }
}

/// Error returned when a status payload is not valid fixed-width hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device status {input:?}: {reason}")]
pub struct ParseStatusError {
    input: String,
    reason: &'static str,
}

impl ParseStatusError {
    /// The payload that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

/// Radix of the code carried by an `er <code>` reply.
///
/// The wire shape alone does not say whether `er 10` means sixteen or ten,
/// so the base is configured explicitly rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCodeBase {
    /// Codes are hexadecimal (`er 1A` = 26). Cytomat devices report this way.
    #[default]
    Hex,
    /// Codes are decimal (`er 26` = 26).
    Decimal,
}

impl ErrorCodeBase {
    /// The numeric radix for [`u16::from_str_radix`].
    pub fn radix(self) -> u32 {
        match self {
            ErrorCodeBase::Hex => 16,
            ErrorCodeBase::Decimal => 10,
        }
    }

    fn accepts(self, b: u8) -> bool {
        match self {
            ErrorCodeBase::Hex => b.is_ascii_hexdigit(),
            ErrorCodeBase::Decimal => b.is_ascii_digit(),
        }
    }
}

/// Error returned when a string does not name an [`ErrorCodeBase`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code base: {0} (expected hex or decimal)")]
pub struct ParseErrorCodeBaseError(String);

impl FromStr for ErrorCodeBase {
    type Err = ParseErrorCodeBaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" | "16" => Ok(ErrorCodeBase::Hex),
            "decimal" | "dec" | "10" => Ok(ErrorCodeBase::Decimal),
            _ => Err(ParseErrorCodeBaseError(s.to_string())),
        }
    }
}

/// Lookup from device error code to a human-readable meaning.
///
/// The full table belongs to the device documentation, so the transaction
/// layer only depends on this trait.
pub trait ErrorCodeTable: Send + Sync {
    /// Describe `code`, or `None` if the table does not know it.
    fn describe(&self, code: u16) -> Option<&'static str>;
}

/// Table that knows no codes. Used when the caller supplies none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDescriptions;

impl ErrorCodeTable for NoDescriptions {
    fn describe(&self, _code: u16) -> Option<&'static str> {
        None
    }
}

/// Table backed by a static slice of `(code, description)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct StaticErrorTable(pub &'static [(u16, &'static str)]);

impl ErrorCodeTable for StaticErrorTable {
    fn describe(&self, code: u16) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, description)| *description)
    }
}

/// Fault reported by the device through an `er <code>` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    code: u16,
    base: ErrorCodeBase,
    description: Option<&'static str>,
}

impl DeviceError {
    /// Construct a device error directly from its code.
    pub fn new(code: u16, base: ErrorCodeBase, description: Option<&'static str>) -> Self {
        DeviceError {
            code,
            base,
            description,
        }
    }

    /// Parse the payload of an `er` reply using the configured radix and
    /// attach the table's description, if any.
    pub fn parse(
        payload: &str,
        base: ErrorCodeBase,
        table: &dyn ErrorCodeTable,
    ) -> Result<Self, ParseErrorCodeError> {
        let digits = payload.trim();
        let fail = || ParseErrorCodeError {
            input: payload.to_string(),
            base,
        };

        if digits.is_empty() || !digits.bytes().all(|b| base.accepts(b)) {
            return Err(fail());
        }
        let code = u16::from_str_radix(digits, base.radix()).map_err(|_| fail())?;

        Ok(DeviceError {
            code,
            base,
            description: table.describe(code),
        })
    }

    /// The numeric error code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The radix the code was reported in.
    pub fn base(&self) -> ErrorCodeBase {
        self.base
    }

    /// Human-readable meaning from the error table, if one was known.
    pub fn description(&self) -> Option<&'static str> {
        self.description
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            ErrorCodeBase::Hex => write!(f, "device error 0x{:02X}", self.code)?,
            ErrorCodeBase::Decimal => write!(f, "device error {}", self.code)?,
        }
        if let Some(description) = self.description {
            write!(f, " ({description})")?;
        }
        Ok(())
    }
}

/// Error returned when an `er` payload is not a valid code in the
/// configured radix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device error code {input:?} (expected {base:?} digits)")]
pub struct ParseErrorCodeError {
    input: String,
    base: ErrorCodeBase,
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // DeviceStatus
    // -----------------------------------------------------------------------

    #[test]
    fn status_from_two_digit_hex() {
        let status = DeviceStatus::from_hex_str("05").unwrap();
        assert_eq!(status.bits(), 0x05);
        assert_eq!(status.digits(), 2);
        assert!(status.bit(0));
        assert!(!status.bit(1));
        assert!(status.bit(2));
    }

    #[test]
    fn status_ignores_surrounding_whitespace() {
        let status: DeviceStatus = " 1a ".parse().unwrap();
        assert_eq!(status.bits(), 0x1A);
        assert_eq!(status.to_string(), "1A");
    }

    #[test]
    fn status_display_keeps_width() {
        assert_eq!(DeviceStatus::from_hex_str("00").unwrap().to_string(), "00");
        assert_eq!(DeviceStatus::from_hex_str("0001").unwrap().to_string(), "0001");
    }

    #[test]
    fn status_rejects_empty() {
        assert!(DeviceStatus::from_hex_str("").is_err());
        assert!(DeviceStatus::from_hex_str("   ").is_err());
    }

    #[test]
    fn status_rejects_non_hex() {
        let err = DeviceStatus::from_hex_str("zz").unwrap_err();
        assert_eq!(err.input(), "zz");
        assert!(err.to_string().contains("not hexadecimal"));
    }

    #[test]
    fn status_rejects_sign_prefix() {
        assert!(DeviceStatus::from_hex_str("+5").is_err());
    }

    #[test]
    fn status_rejects_too_wide() {
        assert!(DeviceStatus::from_hex_str("123456789").is_err());
        assert!(DeviceStatus::from_hex_str("12345678").is_ok());
    }

    #[test]
    fn status_bit_out_of_range_is_false() {
        let status = DeviceStatus::new(u32::MAX, 8);
        assert!(status.bit(31));
        assert!(!status.bit(32));
    }

    #[test]
    fn status_new_clamps_digits() {
        assert_eq!(DeviceStatus::new(0, 0).digits(), 1);
        assert_eq!(DeviceStatus::new(0, 12).digits(), 8);
        assert!(DeviceStatus::new(0, 2).is_clear());
    }

    // -----------------------------------------------------------------------
    // DeviceError
    // -----------------------------------------------------------------------

    #[test]
    fn device_error_hex_code() {
        let err = DeviceError::parse("1A", ErrorCodeBase::Hex, &NoDescriptions).unwrap();
        assert_eq!(err.code(), 0x1A);
        assert_eq!(err.description(), None);
        assert_eq!(err.to_string(), "device error 0x1A");
    }

    #[test]
    fn device_error_decimal_code() {
        let err = DeviceError::parse("26", ErrorCodeBase::Decimal, &NoDescriptions).unwrap();
        assert_eq!(err.code(), 26);
        assert_eq!(err.to_string(), "device error 26");
    }

    #[test]
    fn device_error_decimal_rejects_hex_digits() {
        assert!(DeviceError::parse("1A", ErrorCodeBase::Decimal, &NoDescriptions).is_err());
    }

    #[test]
    fn device_error_rejects_empty_and_overflow() {
        assert!(DeviceError::parse("", ErrorCodeBase::Hex, &NoDescriptions).is_err());
        assert!(DeviceError::parse("10000", ErrorCodeBase::Hex, &NoDescriptions).is_err());
    }

    #[test]
    fn device_error_uses_table_description() {
        static TABLE: StaticErrorTable = StaticErrorTable(&[(0x03, "plate not found")]);
        let err = DeviceError::parse("03", ErrorCodeBase::Hex, &TABLE).unwrap();
        assert_eq!(err.description(), Some("plate not found"));
        assert_eq!(err.to_string(), "device error 0x03 (plate not found)");

        let unknown = DeviceError::parse("04", ErrorCodeBase::Hex, &TABLE).unwrap();
        assert_eq!(unknown.description(), None);
    }

    #[test]
    fn error_code_base_from_str() {
        assert_eq!("hex".parse::<ErrorCodeBase>().unwrap(), ErrorCodeBase::Hex);
        assert_eq!("Decimal".parse::<ErrorCodeBase>().unwrap(), ErrorCodeBase::Decimal);
        assert_eq!("16".parse::<ErrorCodeBase>().unwrap(), ErrorCodeBase::Hex);
        assert_eq!("dec".parse::<ErrorCodeBase>().unwrap(), ErrorCodeBase::Decimal);
        assert_eq!(ErrorCodeBase::default(), ErrorCodeBase::Hex);
    }

    #[test]
    fn error_code_base_from_str_rejects_unknown() {
        let err = "Octal".parse::<ErrorCodeBase>().unwrap_err();
        assert_eq!(err, ParseErrorCodeBaseError("Octal".into()));
        assert_eq!(
            err.to_string(),
            "unknown error code base: Octal (expected hex or decimal)"
        );
    }
}
