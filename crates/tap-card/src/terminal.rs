//! Terminal profile and PDOL answer construction
//!
//! The card hands the terminal a PDOL; the terminal answers with exactly the
//! number of bytes requested per tag, drawn from its configuration and the
//! transaction in flight. Unknown tags are zero-filled so the concatenated
//! answer always matches the requested total length.

use tap_emv::DolEntry;
use tracing::debug;

/// Default terminal country code (USA)
pub const DEFAULT_COUNTRY_CODE: &str = "0840";
/// Default transaction currency code (USD)
pub const DEFAULT_CURRENCY_CODE: &str = "0840";
/// Default transaction date, BCD YYMMDD
pub const DEFAULT_TRANSACTION_DATE: &str = "210101";
/// Terminal Transaction Qualifiers advertised by this terminal
pub const DEFAULT_TTQ: [u8; 4] = [0xB6, 0x00, 0xC0, 0x00];
/// Terminal Verification Results before any verification has run
pub const DEFAULT_TVR: [u8; 5] = [0x00; 5];
/// Fixed unpredictable number; kept stable for reproducible flows
pub const DEFAULT_UNPREDICTABLE_NUMBER: [u8; 4] = [0xA1, 0xB2, 0xC3, 0xD4];

/// Static terminal configuration shared across transactions
#[derive(Debug, Clone)]
pub struct Terminal {
    country_code: String,
    currency_code: String,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            currency_code: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }

    /// Override the 4-digit terminal country code
    pub fn with_country_code(mut self, code: &str) -> Self {
        self.country_code = code.to_string();
        self
    }

    /// Override the 4-digit transaction currency code
    pub fn with_currency_code(mut self, code: &str) -> Self {
        self.currency_code = code.to_string();
        self
    }

    /// Build the PDOL answer for a transaction
    ///
    /// Produces exactly `entry.length` bytes per DOL entry, in DOL order.
    pub fn build_pdol_data(&self, tx: &Transaction, dol: &[DolEntry]) -> Vec<u8> {
        let mut out = Vec::new();

        for entry in dol {
            let bytes = match entry.tag.as_str() {
                "9F66" => fit(&DEFAULT_TTQ, entry.length),
                "9F02" => bcd_number(&tx.authorized_amount, entry.length),
                "9F03" => bcd_number(&tx.secondary_amount, entry.length),
                "9F1A" => hex_config(&self.country_code, entry.length),
                "95" => fit(&DEFAULT_TVR, entry.length),
                "5F2A" => hex_config(&self.currency_code, entry.length),
                "9A" => hex_config(&tx.transaction_date, entry.length),
                "9C" => hex_config(&tx.transaction_type, entry.length),
                "9F37" => fit(&DEFAULT_UNPREDICTABLE_NUMBER, entry.length),
                other => {
                    debug!(tag = other, length = entry.length, "zero-filling unknown PDOL tag");
                    vec![0x00; entry.length]
                }
            };

            out.extend_from_slice(&bytes);
        }

        out
    }
}

/// Per-tap transaction values feeding the PDOL answer
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Authorized amount in minor units, decimal digits
    pub authorized_amount: String,
    /// Secondary amount (cashback), decimal digits
    pub secondary_amount: String,
    /// 2-digit transaction type, e.g. "00" for purchase
    pub transaction_type: String,
    /// Transaction date, YYMMDD digits
    pub transaction_date: String,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            authorized_amount: "0".to_string(),
            secondary_amount: "0".to_string(),
            transaction_type: "00".to_string(),
            transaction_date: DEFAULT_TRANSACTION_DATE.to_string(),
        }
    }
}

impl Transaction {
    /// Purchase of `amount` minor units with no cashback
    pub fn purchase(amount: i64) -> Self {
        Self {
            authorized_amount: amount.to_string(),
            ..Self::default()
        }
    }
}

/// Right-align decimal digits as BCD, zero-padded to `length` bytes
fn bcd_number(digits: &str, length: usize) -> Vec<u8> {
    let clean: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    let want = length * 2;

    let padded = if clean.len() >= want {
        clean[clean.len() - want..].to_string()
    } else {
        format!("{clean:0>want$}")
    };

    hex::decode(&padded).unwrap_or_else(|_| vec![0x00; length])
}

/// Decode a configured digit string (e.g. "0840") into raw bytes
fn hex_config(digits: &str, length: usize) -> Vec<u8> {
    match hex::decode(digits) {
        Ok(bytes) => fit(&bytes, length),
        Err(_) => vec![0x00; length],
    }
}

/// Clamp or zero-pad a byte slice to exactly `length` bytes
fn fit(bytes: &[u8], length: usize) -> Vec<u8> {
    let mut out = vec![0x00; length];
    let n = bytes.len().min(length);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_emv::parse_dol;

    fn build(pdol_hex: &str, tx: &Transaction) -> Vec<u8> {
        let dol = parse_dol(&hex::decode(pdol_hex).unwrap()).unwrap();
        Terminal::new().build_pdol_data(tx, &dol)
    }

    #[test]
    fn test_terminal_transaction_qualifier() {
        let result = build("9F6604", &Transaction::default());
        assert_eq!(result, vec![0xB6, 0x00, 0xC0, 0x00]);
    }

    #[test]
    fn test_authorized_amount() {
        let tx = Transaction {
            authorized_amount: "1234".to_string(),
            ..Transaction::default()
        };
        let result = build("9F0206", &tx);
        assert_eq!(result, hex::decode("000000001234").unwrap());
    }

    #[test]
    fn test_secondary_amount() {
        let tx = Transaction {
            secondary_amount: "5678".to_string(),
            ..Transaction::default()
        };
        let result = build("9F0306", &tx);
        assert_eq!(result, hex::decode("000000005678").unwrap());
    }

    #[test]
    fn test_country_and_currency() {
        assert_eq!(build("9F1A02", &Transaction::default()), vec![0x08, 0x40]);
        assert_eq!(build("5F2A02", &Transaction::default()), vec![0x08, 0x40]);
    }

    #[test]
    fn test_verification_results() {
        assert_eq!(build("9505", &Transaction::default()), vec![0x00; 5]);
    }

    #[test]
    fn test_transaction_date() {
        assert_eq!(
            build("9A03", &Transaction::default()),
            vec![0x21, 0x01, 0x01]
        );
    }

    #[test]
    fn test_transaction_type() {
        assert_eq!(build("9C01", &Transaction::default()), vec![0x00]);
    }

    #[test]
    fn test_unpredictable_number() {
        assert_eq!(
            build("9F3704", &Transaction::default()),
            vec![0xA1, 0xB2, 0xC3, 0xD4]
        );
    }

    #[test]
    fn test_unknown_tag_zero_filled() {
        let result = build("9F4A03", &Transaction::default());
        assert_eq!(result, vec![0x00; 3]);
    }

    #[test]
    fn test_full_visa_pdol() {
        // PDOL as seen on Visa contactless cards
        let pdol_hex = "9F66049F02069F03069F1A0295055F2A029A039C019F3704";
        let tx = Transaction {
            authorized_amount: "1234".to_string(),
            secondary_amount: "5678".to_string(),
            ..Transaction::default()
        };

        let dol = parse_dol(&hex::decode(pdol_hex).unwrap()).unwrap();
        let total: usize = dol.iter().map(|e| e.length).sum();
        let result = Terminal::new().build_pdol_data(&tx, &dol);

        assert_eq!(result.len(), total);
        assert_eq!(
            hex::encode(&result),
            "b600c00000000000123400000000567808400000000000084021010100a1b2c3d4"
        );
    }

    #[test]
    fn test_gpo_command_wrapping() {
        let pdol_hex = "9F66049F02069F03069F1A0295055F2A029A039C019F3704";
        let tx = Transaction {
            authorized_amount: "1234".to_string(),
            secondary_amount: "5678".to_string(),
            ..Transaction::default()
        };

        let dol = parse_dol(&hex::decode(pdol_hex).unwrap()).unwrap();
        let data = Terminal::new().build_pdol_data(&tx, &dol);
        let command = crate::apdu::commands::get_processing_options(&data);

        assert_eq!(
            hex::encode(command.to_bytes()),
            "80a80000238321b600c00000000000123400000000567808400000000000084021010100a1b2c3d400"
        );
    }

    #[test]
    fn test_short_pdol_command() {
        // PDOL from a card that only asks for TTQ, amount, UN and country
        let pdol_hex = "9F66049F02069F37049F1A02";
        let tx = Transaction {
            authorized_amount: "1234".to_string(),
            ..Transaction::default()
        };

        let dol = parse_dol(&hex::decode(pdol_hex).unwrap()).unwrap();
        let data = Terminal::new().build_pdol_data(&tx, &dol);
        let command = crate::apdu::commands::get_processing_options(&data);

        assert_eq!(
            hex::encode(command.to_bytes()),
            "80a80000128310b600c000000000001234a1b2c3d4084000"
        );
    }
}
