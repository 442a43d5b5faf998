//! Common EMV tags used in payment card processing

// Application metadata
pub const APPLICATION_IDENTIFIER: &str = "4F";
pub const APPLICATION_LABEL: &str = "50";
pub const APPLICATION_PAN: &str = "5A";
pub const APPLICATION_EXPIRATION_DATE: &str = "5F24";
pub const APPLICATION_PRIORITY: &str = "87";
pub const ADF_NAME: &str = "84";

// Cardholder data
pub const CARDHOLDER_NAME: &str = "5F20";
pub const TRACK_2_EQUIVALENT_DATA: &str = "57";

// Transaction data
pub const TRANSACTION_CURRENCY_CODE: &str = "5F2A";
pub const TERMINAL_COUNTRY_CODE: &str = "9F1A";
pub const AUTHORIZED_AMOUNT: &str = "9F02";
pub const SECONDARY_AMOUNT: &str = "9F03";
pub const TRANSACTION_DATE: &str = "9A";
pub const TRANSACTION_TYPE: &str = "9C";
pub const TERMINAL_VERIFICATION_RESULTS: &str = "95";
pub const TERMINAL_TRANSACTION_QUALIFIERS: &str = "9F66";
pub const UNPREDICTABLE_NUMBER: &str = "9F37";
pub const PDOL: &str = "9F38";
pub const AIP: &str = "82";
pub const AFL: &str = "94";
pub const ATC: &str = "9F36";
pub const APPLICATION_CRYPTOGRAM: &str = "9F26";
pub const CRYPTOGRAM_INFORMATION_DATA: &str = "9F27";

// Templates
pub const FCI_TEMPLATE: &str = "6F";
pub const FCI_PROPRIETARY_TEMPLATE: &str = "A5";
pub const FCI_ISSUER_DISCRETIONARY_DATA: &str = "BF0C";
pub const APPLICATION_TEMPLATE: &str = "61";
pub const RECORD_TEMPLATE: &str = "70";
pub const RESPONSE_TEMPLATE_FORMAT_1: &str = "80";
pub const RESPONSE_TEMPLATE_FORMAT_2: &str = "77";
pub const GPO_COMMAND_TEMPLATE: &str = "83";

/// Get a human-readable name for an EMV tag
pub fn tag_name(tag: &str) -> &'static str {
    match tag {
        "4F" => "Application Identifier (AID)",
        "50" => "Application Label",
        "57" => "Track 2 Equivalent Data",
        "5A" => "Application PAN",
        "5F20" => "Cardholder Name",
        "5F24" => "Application Expiration Date",
        "5F2A" => "Transaction Currency Code",
        "5F34" => "Application PAN Sequence Number",
        "61" => "Application Template",
        "6F" => "FCI Template",
        "70" => "Record Template",
        "77" => "Response Message Template Format 2",
        "80" => "Response Message Template Format 1",
        "82" => "Application Interchange Profile",
        "84" => "ADF Name",
        "87" => "Application Priority Indicator",
        "94" => "Application File Locator",
        "95" => "Terminal Verification Results",
        "9A" => "Transaction Date",
        "9C" => "Transaction Type",
        "9F02" => "Amount, Authorized",
        "9F03" => "Amount, Other",
        "9F10" => "Issuer Application Data",
        "9F1A" => "Terminal Country Code",
        "9F26" => "Application Cryptogram",
        "9F27" => "Cryptogram Information Data",
        "9F36" => "Application Transaction Counter",
        "9F37" => "Unpredictable Number",
        "9F38" => "PDOL",
        "9F66" => "Terminal Transaction Qualifiers",
        "9F6C" => "Card Transaction Qualifiers",
        "9F6E" => "Form Factor Indicator",
        "A5" => "FCI Proprietary Template",
        "BF0C" => "FCI Issuer Discretionary Data",
        _ => "Unknown Tag",
    }
}
