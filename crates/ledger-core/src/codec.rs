//! # Protocol Codec
//!
//! Pure, stateless translation between domain records and the ERP
//! terminal's XML envelope format.
//!
//! ## Envelope Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  <ENVELOPE>                                                             │
//! │    <HEADER><TALLYREQUEST>Export Data | Import Data</TALLYREQUEST>       │
//! │    <BODY>                                                               │
//! │      EXPORT:  <EXPORTDATA><REQUESTDESC>                                 │
//! │                 <REPORTNAME>..</REPORTNAME>                             │
//! │                 <STATICVARIABLES>..</STATICVARIABLES>                   │
//! │               </REQUESTDESC></EXPORTDATA>                               │
//! │                                                                         │
//! │      IMPORT:  <IMPORTDATA><REQUESTDESC><REPORTNAME>..</REQUESTDESC>     │
//! │                 <REQUESTDATA><TALLYMESSAGE>                             │
//! │                   LEDGER | VOUCHER block                                │
//! │                 </TALLYMESSAGE></REQUESTDATA>                           │
//! │               </IMPORTDATA>                                             │
//! │    </BODY>                                                              │
//! │  </ENVELOPE>                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decoding Is Lenient
//! Terminals in the field disagree on attribute order, whitespace, and
//! which optional tags they emit, so responses are read with targeted
//! extraction rather than a strict schema. A response that is not an
//! envelope at all decodes to "nothing extracted" (an empty `Vec`), which
//! callers can tell apart from an explicit error marker.
//!
//! ## Price Fallback Chain
//! ```text
//! OPENINGRATE "1,200.00/Pcs" ──► strip separators/suffix ──► 1200.00
//!         │ absent or zero
//!         ▼
//! |OPENINGVALUE| / |OPENINGBALANCE| ──► value per unit
//!         │ either absent or zero
//!         ▼
//! DEFAULT_STOCK_PRICE (100.00)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::money::Money;
use crate::types::{Order, OrderLine, StockItem};
use crate::{CUSTOMER_LEDGER_GROUP, STANDARD_PRICE_LEVEL, STOCK_UNIT};

/// Price assigned to a stock item when the export carries neither a rate
/// nor a value/quantity pair.
pub const DEFAULT_STOCK_PRICE: Money = Money::from_cents(10000);

// =============================================================================
// Outcome
// =============================================================================

/// Classification of an ERP terminal response body.
///
/// A missing body is not an `Outcome` at all; that is a transport failure
/// and is reported by the sync client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No error markers, or an explicit created/altered count.
    Success,
    /// The terminal refused a create because the record is already there.
    /// Idempotent creates treat this as success.
    AlreadyExists,
    /// Explicit error markers. The message is the terminal's own text.
    Error(String),
}

impl Outcome {
    /// Success or AlreadyExists.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::AlreadyExists)
    }
}

// =============================================================================
// Envelope Builders
// =============================================================================

/// Envelope requesting the company list. Used only to verify that a
/// terminal is reachable.
pub fn build_connection_test() -> String {
    let mut w = XmlWriter::new();
    export_request(&mut w, "List of Companies", &[("SVEXPORTFORMAT", "$$SysName:XML")]);
    w.finish()
}

/// Envelope requesting every inventory master as structured XML.
pub fn build_stock_export_request() -> String {
    let mut w = XmlWriter::new();
    export_request(
        &mut w,
        "List of Accounts",
        &[
            ("SVEXPORTFORMAT", "$$SysName:XML"),
            ("ACCOUNTTYPE", "All Inventory Masters"),
        ],
    );
    w.finish()
}

/// Envelope creating a customer ledger under Sundry Debtors.
///
/// Sending it twice is harmless: the second response decodes to
/// [`Outcome::AlreadyExists`].
pub fn build_ledger_create(name: &str) -> String {
    let mut w = XmlWriter::new();
    import_request(&mut w, "All Masters", |w| {
        w.open_with_attrs("LEDGER", &[("NAME", name), ("ACTION", "Create")]);
        w.open("NAME.LIST");
        w.element("NAME", name);
        w.close("NAME.LIST");
        w.element("PARENT", CUSTOMER_LEDGER_GROUP);
        w.element("OPENINGBALANCE", "0");
        w.element("ISBILLWISEON", "Yes");
        w.close("LEDGER");
    });
    w.finish()
}

/// Envelope creating a Sales Order voucher for `order`.
///
/// Each line becomes one `ALLINVENTORYENTRIES.LIST` block whose amount is
/// negated (sales are credits in the terminal's convention) and repeated in
/// an accounting allocation against `sales_ledger`.
pub fn build_voucher_create(order: &Order, lines: &[OrderLine], sales_ledger: &str) -> String {
    let date = order.order_date.format("%Y%m%d").to_string();
    let price_level = order
        .price_level
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(STANDARD_PRICE_LEVEL);
    let narration = format!("Online Order ID: {}", order.id);

    let mut w = XmlWriter::new();
    import_request(&mut w, "Vouchers", |w| {
        w.open_with_attrs("VOUCHER", &[("VCHTYPE", "Sales Order"), ("ACTION", "Create")]);
        w.element("DATE", &date);
        w.element("VOUCHERNUMBER", &order.order_number);
        w.element("PARTYLEDGERNAME", &order.customer_name);
        w.element("PRICELEVEL", price_level);
        w.element("NARRATION", &narration);
        w.element("EFFECTIVEDATE", &date);

        for line in lines {
            let amount = (-line.amount()).to_string();
            w.open("ALLINVENTORYENTRIES.LIST");
            w.element("STOCKITEMNAME", line.stock_item_name());
            w.element("RATE", &format!("{}/{}", line.rate(), STOCK_UNIT));
            w.element("ACTUALQTY", &format!("{} {}", line.quantity, STOCK_UNIT));
            w.element("BILLEDQTY", &format!("{} {}", line.quantity, STOCK_UNIT));
            w.element("AMOUNT", &amount);
            w.open("ACCOUNTINGALLOCATIONS.LIST");
            w.element("LEDGERNAME", sales_ledger);
            w.element("AMOUNT", &amount);
            w.close("ACCOUNTINGALLOCATIONS.LIST");
            w.close("ALLINVENTORYENTRIES.LIST");
        }

        w.close("VOUCHER");
    });
    w.finish()
}

fn export_request(w: &mut XmlWriter, report: &str, static_vars: &[(&str, &str)]) {
    w.open("ENVELOPE");
    w.open("HEADER");
    w.element("TALLYREQUEST", "Export Data");
    w.close("HEADER");
    w.open("BODY");
    w.open("EXPORTDATA");
    w.open("REQUESTDESC");
    w.element("REPORTNAME", report);
    w.open("STATICVARIABLES");
    for (tag, value) in static_vars {
        w.element(tag, value);
    }
    w.close("STATICVARIABLES");
    w.close("REQUESTDESC");
    w.close("EXPORTDATA");
    w.close("BODY");
    w.close("ENVELOPE");
}

fn import_request(w: &mut XmlWriter, report: &str, message: impl FnOnce(&mut XmlWriter)) {
    w.open("ENVELOPE");
    w.open("HEADER");
    w.element("TALLYREQUEST", "Import Data");
    w.close("HEADER");
    w.open("BODY");
    w.open("IMPORTDATA");
    w.open("REQUESTDESC");
    w.element("REPORTNAME", report);
    w.close("REQUESTDESC");
    w.open("REQUESTDATA");
    w.open_with_attrs("TALLYMESSAGE", &[("xmlns:UDF", "TallyUDF")]);
    message(w);
    w.close("TALLYMESSAGE");
    w.close("REQUESTDATA");
    w.close("IMPORTDATA");
    w.close("BODY");
    w.close("ENVELOPE");
}

// =============================================================================
// Response Decoders
// =============================================================================

static STOCK_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<STOCKITEM\b([^>]*?)(?:/>|>(.*?)</STOCKITEM>)").expect("valid regex")
});
static NAME_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bNAME\s*=\s*"([^"]*)""#).expect("valid regex"));
static GUID_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bGUID\s*=\s*"([^"]*)""#).expect("valid regex"));
static RATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,.]+").expect("valid regex"));
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?[\d,]*\.?\d+").expect("valid regex"));

/// Decodes every `STOCKITEM` block in an export response.
///
/// Blocks without a name are skipped. A body that is not an envelope
/// yields an empty `Vec`.
pub fn parse_stock_items(xml: &str) -> Vec<StockItem> {
    if !is_envelope(xml) {
        return Vec::new();
    }

    STOCK_ITEM_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            decode_stock_item(attrs, body)
        })
        .collect()
}

fn decode_stock_item(attrs: &str, body: &str) -> Option<StockItem> {
    let name = capture(&NAME_ATTR_RE, attrs)
        .or_else(|| child_text(body, "NAME").map(str::to_string))
        .map(|n| unescape_xml(n.trim()))
        .filter(|n| !n.is_empty())?;

    let quantity = child_text(body, "OPENINGBALANCE").and_then(leading_number);
    let stock = quantity.map(f64::abs).unwrap_or(0.0);

    let price = child_text(body, "OPENINGRATE")
        .and_then(parse_rate)
        .filter(Money::is_positive)
        .or_else(|| value_per_unit(child_text(body, "OPENINGVALUE"), quantity))
        .unwrap_or(DEFAULT_STOCK_PRICE);

    let external_id = capture(&GUID_ATTR_RE, attrs)
        .or_else(|| child_text(body, "GUID").map(str::to_string))
        .map(|g| unescape_xml(g.trim()))
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| name.clone());

    Some(StockItem {
        name,
        stock,
        price,
        external_id,
    })
}

/// Extracts a rate such as `"1,200.00/Pcs"` as 1200.00.
fn parse_rate(raw: &str) -> Option<Money> {
    let matched = RATE_RE.find(raw)?.as_str().replace(',', "");
    Money::parse_decimal(&matched)
}

fn value_per_unit(value: Option<&str>, quantity: Option<f64>) -> Option<Money> {
    let value = value.and_then(leading_number)?.abs();
    let quantity = quantity?.abs();
    if value > 0.0 && quantity > 0.0 {
        Money::from_f64_rounded(value / quantity).filter(Money::is_positive)
    } else {
        None
    }
}

/// First signed number in `raw`, thousands separators ignored.
fn leading_number(raw: &str) -> Option<f64> {
    NUMBER_RE.find(raw)?.as_str().replace(',', "").parse().ok()
}

/// Classifies a response body.
///
/// ```text
/// LINEERROR present                          ──► Error / AlreadyExists
/// ERRORS > 0 and CREATED + ALTERED == 0      ──► Error / AlreadyExists
/// anything else                              ──► Success
/// ```
///
/// An error whose text mentions "already exists" or "duplicate" is
/// `AlreadyExists`.
pub fn parse_outcome(xml: &str) -> Outcome {
    let line_error = child_text(xml, "LINEERROR")
        .map(|e| unescape_xml(e.trim()))
        .filter(|e| !e.is_empty());
    let errors = count(xml, "ERRORS");
    let applied = count(xml, "CREATED") + count(xml, "ALTERED");

    let message = match line_error {
        Some(msg) => msg,
        None if errors > 0 && applied == 0 => format!("terminal reported {errors} error(s)"),
        None => return Outcome::Success,
    };

    let lowered = message.to_lowercase();
    if lowered.contains("already exists") || lowered.contains("duplicate") {
        Outcome::AlreadyExists
    } else {
        Outcome::Error(message)
    }
}

fn count(xml: &str, tag: &str) -> i64 {
    child_text(xml, tag)
        .and_then(|t| t.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn is_envelope(xml: &str) -> bool {
    xml.contains("<ENVELOPE") && xml.contains("</ENVELOPE>")
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Text content of the first `<tag>` element in `xml`.
///
/// Matches `<tag>` and `<tag attr="..">` but not longer tag names that
/// share the prefix (`<NAME.LIST>` is not `<NAME>`). A self-closing
/// element yields `""`.
fn child_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut from = 0;

    while let Some(pos) = xml[from..].find(&open) {
        let after_name = from + pos + open.len();
        let rest = &xml[after_name..];
        let content_start = match rest.chars().next() {
            Some('>') => after_name + 1,
            Some(c) if c.is_whitespace() || c == '/' => {
                let gt = rest.find('>')?;
                if rest[..gt].ends_with('/') {
                    return Some("");
                }
                after_name + gt + 1
            }
            _ => {
                from = after_name;
                continue;
            }
        };
        let end = xml[content_start..].find(&close)?;
        return Some(&xml[content_start..content_start + end]);
    }
    None
}

// =============================================================================
// Escaping
// =============================================================================

/// Escapes text for use in element content or a double-quoted attribute.
pub fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_xml(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Minimal indented writer for outbound envelopes.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::with_capacity(1024),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, tag: &str) {
        self.open_with_attrs(tag, &[]);
    }

    fn open_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_xml(value));
            self.out.push('"');
        }
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn element(&mut self, tag: &str, text: &str) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.out.push_str(&escape_xml(text));
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn finish(self) -> String {
        self.out
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderSyncState;
    use chrono::{TimeZone, Utc};

    fn order() -> Order {
        let date = Utc.with_ymd_and_hms(2024, 3, 7, 10, 30, 0).unwrap();
        Order {
            id: "o-1".into(),
            account_id: "acct-1".into(),
            order_number: "ORD-1709807400000-acct-1".into(),
            customer_name: "Acme & Sons".into(),
            order_date: date,
            price_level: Some("Wholesale".into()),
            payment_mode: None,
            subtotal_cents: 35000,
            tax_cents: 0,
            total_cents: 35000,
            sync_state: OrderSyncState::Pending,
            voucher_number: None,
            voucher_date: None,
            created_at: date,
        }
    }

    fn line(id: &str, erp: Option<&str>, qty: i64, rate_cents: i64) -> OrderLine {
        OrderLine {
            id: id.into(),
            order_id: "o-1".into(),
            product_id: format!("p-{id}"),
            product_name: format!("Product {id}"),
            erp_item_name: erp.map(String::from),
            quantity: qty,
            rate_cents,
            amount_cents: rate_cents * qty,
            tax_rate_bps: 0,
        }
    }

    fn stock_fixture(items: &str) -> String {
        format!(
            "<ENVELOPE><HEADER><VERSION>1</VERSION></HEADER><BODY><IMPORTDATA>\
             <REQUESTDATA>{items}</REQUESTDATA></IMPORTDATA></BODY></ENVELOPE>"
        )
    }

    #[test]
    fn test_connection_test_envelope() {
        let xml = build_connection_test();
        assert!(xml.contains("<TALLYREQUEST>Export Data</TALLYREQUEST>"));
        assert!(xml.contains("<REPORTNAME>List of Companies</REPORTNAME>"));
        assert!(xml.contains("<SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>"));
    }

    #[test]
    fn test_stock_export_envelope() {
        let xml = build_stock_export_request();
        assert!(xml.contains("<REPORTNAME>List of Accounts</REPORTNAME>"));
        assert!(xml.contains("<ACCOUNTTYPE>All Inventory Masters</ACCOUNTTYPE>"));
    }

    #[test]
    fn test_ledger_create_envelope() {
        let xml = build_ledger_create("Acme & Sons");
        assert!(xml.contains("<TALLYREQUEST>Import Data</TALLYREQUEST>"));
        assert!(xml.contains("<REPORTNAME>All Masters</REPORTNAME>"));
        assert!(xml.contains(r#"<LEDGER NAME="Acme &amp; Sons" ACTION="Create">"#));
        assert!(xml.contains("<NAME>Acme &amp; Sons</NAME>"));
        assert!(xml.contains("<PARENT>Sundry Debtors</PARENT>"));
        assert!(xml.contains("<ISBILLWISEON>Yes</ISBILLWISEON>"));
    }

    #[test]
    fn test_voucher_two_lines_carry_negative_amounts() {
        let lines = vec![
            line("a", Some("WIDGET"), 3, 10000),
            line("b", None, 1, 5000),
        ];
        let xml = build_voucher_create(&order(), &lines, "Sales");

        assert!(xml.contains(r#"<VOUCHER VCHTYPE="Sales Order" ACTION="Create">"#));
        assert!(xml.contains("<DATE>20240307</DATE>"));
        assert!(xml.contains("<EFFECTIVEDATE>20240307</EFFECTIVEDATE>"));
        assert!(xml.contains("<VOUCHERNUMBER>ORD-1709807400000-acct-1</VOUCHERNUMBER>"));
        assert!(xml.contains("<PARTYLEDGERNAME>Acme &amp; Sons</PARTYLEDGERNAME>"));
        assert!(xml.contains("<PRICELEVEL>Wholesale</PRICELEVEL>"));
        assert!(xml.contains("<NARRATION>Online Order ID: o-1</NARRATION>"));

        assert_eq!(xml.matches("<ALLINVENTORYENTRIES.LIST>").count(), 2);
        assert_eq!(xml.matches("<AMOUNT>-300.00</AMOUNT>").count(), 2);
        assert_eq!(xml.matches("<AMOUNT>-50.00</AMOUNT>").count(), 2);
        assert!(xml.contains("<STOCKITEMNAME>WIDGET</STOCKITEMNAME>"));
        assert!(xml.contains("<STOCKITEMNAME>Product b</STOCKITEMNAME>"));
        assert!(xml.contains("<RATE>100.00/Pcs</RATE>"));
        assert!(xml.contains("<ACTUALQTY>3 Pcs</ACTUALQTY>"));
        assert!(xml.contains("<BILLEDQTY>1 Pcs</BILLEDQTY>"));
        assert_eq!(xml.matches("<LEDGERNAME>Sales</LEDGERNAME>").count(), 2);

        let first = xml.find("-300.00").unwrap();
        let second = xml.find("-50.00").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_voucher_defaults_price_level_to_standard() {
        let mut o = order();
        o.price_level = None;
        let xml = build_voucher_create(&o, &[], "Sales");
        assert!(xml.contains("<PRICELEVEL>Standard</PRICELEVEL>"));
    }

    #[test]
    fn test_parse_n_blocks_yields_n_records() {
        let xml = stock_fixture(
            r#"<TALLYMESSAGE><STOCKITEM NAME="Bolt" GUID="g-1">
                 <OPENINGBALANCE> -40 Pcs</OPENINGBALANCE>
                 <OPENINGRATE>1,200.00/Pcs</OPENINGRATE>
               </STOCKITEM></TALLYMESSAGE>
               <TALLYMESSAGE><STOCKITEM NAME="Nut">
                 <OPENINGBALANCE>10 Pcs</OPENINGBALANCE>
                 <OPENINGVALUE>-250.00</OPENINGVALUE>
               </STOCKITEM></TALLYMESSAGE>
               <TALLYMESSAGE><STOCKITEM NAME="Washer">
                 <OPENINGBALANCE>0</OPENINGBALANCE>
               </STOCKITEM></TALLYMESSAGE>"#,
        );

        let items = parse_stock_items(&xml);
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].name, "Bolt");
        assert_eq!(items[0].stock, 40.0);
        assert_eq!(items[0].price, Money::from_cents(120000));
        assert_eq!(items[0].external_id, "g-1");

        assert_eq!(items[1].stock, 10.0);
        assert_eq!(items[1].price, Money::from_cents(2500));
        assert_eq!(items[1].external_id, "Nut");

        assert_eq!(items[2].price, DEFAULT_STOCK_PRICE);
    }

    #[test]
    fn test_rate_with_separator_and_suffix() {
        let xml = stock_fixture(
            r#"<STOCKITEM NAME="Gear"><OPENINGRATE>1,200.00/Pcs</OPENINGRATE></STOCKITEM>"#,
        );
        let items = parse_stock_items(&xml);
        assert_eq!(items[0].price.to_string(), "1200.00");
    }

    #[test]
    fn test_zero_rate_falls_through_to_value() {
        let xml = stock_fixture(
            r#"<STOCKITEM NAME="Cog">
                 <OPENINGBALANCE>4 Pcs</OPENINGBALANCE>
                 <OPENINGRATE>0.00/Pcs</OPENINGRATE>
                 <OPENINGVALUE>100.00</OPENINGVALUE>
               </STOCKITEM>"#,
        );
        assert_eq!(parse_stock_items(&xml)[0].price, Money::from_cents(2500));
    }

    #[test]
    fn test_value_without_quantity_uses_default() {
        let xml = stock_fixture(
            r#"<STOCKITEM NAME="Cog"><OPENINGVALUE>100.00</OPENINGVALUE></STOCKITEM>"#,
        );
        let items = parse_stock_items(&xml);
        assert_eq!(items[0].stock, 0.0);
        assert_eq!(items[0].price, DEFAULT_STOCK_PRICE);
    }

    #[test]
    fn test_name_from_child_and_entities() {
        let xml = stock_fixture(
            r#"<STOCKITEM><NAME.LIST><NAME>Nuts &amp; Bolts</NAME></NAME.LIST>
               <GUID>abc</GUID></STOCKITEM>"#,
        );
        let items = parse_stock_items(&xml);
        assert_eq!(items[0].name, "Nuts & Bolts");
        assert_eq!(items[0].external_id, "abc");
    }

    #[test]
    fn test_malformed_input_yields_empty() {
        assert!(parse_stock_items("").is_empty());
        assert!(parse_stock_items("<html>502 Bad Gateway</html>").is_empty());
        assert!(parse_stock_items("<ENVELOPE><STOCKITEM NAME=\"x\">").is_empty());
        assert!(parse_stock_items(&stock_fixture("")).is_empty());
    }

    #[test]
    fn test_outcome_created() {
        let xml = "<RESPONSE><CREATED>1</CREATED><ALTERED>0</ALTERED><ERRORS>0</ERRORS></RESPONSE>";
        assert_eq!(parse_outcome(xml), Outcome::Success);
    }

    #[test]
    fn test_outcome_plain_body_is_success() {
        assert_eq!(parse_outcome("<ENVELOPE></ENVELOPE>"), Outcome::Success);
    }

    #[test]
    fn test_outcome_error_count() {
        let xml = "<RESPONSE><CREATED>0</CREATED><ERRORS>1</ERRORS></RESPONSE>";
        assert!(matches!(parse_outcome(xml), Outcome::Error(_)));
    }

    #[test]
    fn test_outcome_line_error() {
        let xml = "<RESPONSE><LINEERROR>Stock Item 'X' does not exist!</LINEERROR></RESPONSE>";
        assert_eq!(
            parse_outcome(xml),
            Outcome::Error("Stock Item 'X' does not exist!".into())
        );
    }

    #[test]
    fn test_outcome_already_exists() {
        let xml = "<RESPONSE><LINEERROR>Ledger 'Acme' already exists</LINEERROR>\
                   <ERRORS>1</ERRORS></RESPONSE>";
        assert_eq!(parse_outcome(xml), Outcome::AlreadyExists);
        assert!(parse_outcome(xml).is_success());

        let dup = "<RESPONSE><LINEERROR>Duplicate entry</LINEERROR></RESPONSE>";
        assert_eq!(parse_outcome(dup), Outcome::AlreadyExists);
    }

    #[test]
    fn test_child_text_skips_prefixed_tags() {
        let xml = "<A><NAME.LIST><NAME>inner</NAME></NAME.LIST></A>";
        assert_eq!(child_text(xml, "NAME"), Some("inner"));
        assert_eq!(child_text("<X><GUID/></X>", "GUID"), Some(""));
        assert_eq!(child_text("<X TYPE=\"a\">v</X>", "X"), Some("v"));
    }
}
