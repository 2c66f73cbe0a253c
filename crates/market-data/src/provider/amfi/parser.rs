//! Parsers for AMFI's semicolon-separated NAV text files.
//!
//! Both the daily `NAVAll.txt` listing and the NAV history report share the
//! same shape: a header row naming the columns, then data rows interleaved with
//! free-text section lines (scheme type, fund house) and blank lines. Columns
//! are located by header name since the two files order them differently.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{InstrumentCategory, TickerListing, TickerMetadata};

const DATE_FORMAT: &str = "%d-%b-%Y";

/// Values AMFI uses for "no value".
const NULL_VALUES: [&str; 2] = ["N.A.", "-"];

/// Attribute key for the scheme type section a row appears under.
pub const ATTR_SCHEME_TYPE: &str = "scheme_type";
/// Attribute key for the fund house a row appears under.
pub const ATTR_FUND_HOUSE: &str = "fund_house";

/// One NAV observation from a history report or the daily listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavRow {
    pub scheme_code: String,
    pub date: NaiveDate,
    pub nav: Decimal,
}

struct Columns {
    code: usize,
    name: Option<usize>,
    isin_growth: Option<usize>,
    isin_reinvest: Option<usize>,
    nav: Option<usize>,
    date: usize,
    width: usize,
}

impl Columns {
    fn from_header(line: &str) -> Result<Self, MarketDataError> {
        let headers: Vec<&str> = line.split(';').map(str::trim).collect();
        let find = |pred: &dyn Fn(&str) -> bool| headers.iter().position(|h| pred(h));

        let code = find(&|h| h.eq_ignore_ascii_case("Scheme Code"))
            .ok_or_else(|| MarketDataError::Parse("missing 'Scheme Code' column".to_string()))?;
        let date = find(&|h| h.eq_ignore_ascii_case("Date"))
            .ok_or_else(|| MarketDataError::Parse("missing 'Date' column".to_string()))?;

        Ok(Self {
            code,
            name: find(&|h| h.eq_ignore_ascii_case("Scheme Name")),
            isin_growth: find(&|h| h.starts_with("ISIN") && h.contains("Growth")),
            isin_reinvest: find(&|h| h.starts_with("ISIN") && h.contains("Reinvestment")),
            nav: find(&|h| h.eq_ignore_ascii_case("Net Asset Value")),
            date,
            width: headers.len(),
        })
    }
}

fn value<'a>(fields: &[&'a str], index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|i| fields.get(i))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && !NULL_VALUES.contains(v))
}

/// Splits the text at its header row, returning the column layout and the
/// remaining lines.
fn split_header(text: &str) -> Result<(Columns, std::str::Lines<'_>), MarketDataError> {
    let mut lines = text.lines();
    for line in lines.by_ref() {
        if line.contains("Scheme Code") {
            return Ok((Columns::from_header(line)?, lines));
        }
    }
    Err(MarketDataError::Parse("missing header row".to_string()))
}

/// Parses the daily listing (`NAVAll.txt`) into ticker listings.
///
/// Rows without a date are dropped. Section lines are tracked so each listing
/// carries the scheme type and fund house it was published under.
pub fn parse_listing(text: &str) -> Result<Vec<TickerListing>, MarketDataError> {
    let (columns, lines) = split_header(text)?;

    let mut scheme_type: Option<String> = None;
    let mut fund_house: Option<String> = None;
    let mut listings = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.contains(';') {
            if trimmed.contains("Schemes(") || trimmed.contains("Schemes (") {
                scheme_type = Some(trimmed.to_string());
                fund_house = None;
            } else {
                fund_house = Some(trimmed.to_string());
            }
            continue;
        }

        let fields: Vec<&str> = trimmed.split(';').collect();
        if fields.len() < columns.width {
            continue;
        }
        let (Some(code), Some(_)) = (value(&fields, Some(columns.code)), value(&fields, Some(columns.date))) else {
            continue;
        };

        let name = value(&fields, columns.name).unwrap_or(code);
        let mut metadata = TickerMetadata::new(name, InstrumentCategory::MutualFund);
        if let Some(isin) =
            value(&fields, columns.isin_growth).or_else(|| value(&fields, columns.isin_reinvest))
        {
            metadata = metadata.with_isin(isin);
        }
        if let Some(kind) = &scheme_type {
            metadata = metadata.with_attribute(ATTR_SCHEME_TYPE, kind.clone());
        }
        if let Some(house) = &fund_house {
            metadata = metadata.with_attribute(ATTR_FUND_HOUSE, house.clone());
        }
        listings.push(TickerListing::new(code, metadata));
    }

    Ok(listings)
}

/// Parses NAV rows from a history report or the daily listing.
///
/// Rows with a missing or unparseable NAV or date are skipped; only a missing
/// header (or NAV column) is an error.
pub fn parse_navs(text: &str) -> Result<Vec<NavRow>, MarketDataError> {
    let (columns, lines) = split_header(text)?;
    if columns.nav.is_none() {
        return Err(MarketDataError::Parse(
            "missing 'Net Asset Value' column".to_string(),
        ));
    }

    let rows = lines
        .map(str::trim)
        .filter(|line| line.contains(';'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < columns.width {
                return None;
            }
            let code = value(&fields, Some(columns.code))?;
            let nav = Decimal::from_str(value(&fields, columns.nav)?).ok()?;
            let date = NaiveDate::parse_from_str(value(&fields, Some(columns.date))?, DATE_FORMAT)
                .ok()?;
            Some(NavRow {
                scheme_code: code.to_string(),
                date,
                nav,
            })
        })
        .collect();

    Ok(rows)
}

/// Formats a date the way the history report's query string expects.
pub fn format_report_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const LISTING: &str = "\
Scheme Code;ISIN Div Payout/ ISIN Growth;ISIN Div Reinvestment;Scheme Name;Net Asset Value;Date

Open Ended Schemes(Debt Scheme - Banking and PSU Fund)

Aditya Birla Sun Life Mutual Fund

119551;INF209KA12Z1;INF209KA13Z9;Aditya Birla Sun Life Banking & PSU Debt Fund  - DIRECT - IDCW;104.8746;17-Oct-2025
108272;-;INF209K01LE0;Aditya Birla Sun Life Banking & PSU Debt Fund  - REGULAR - IDCW;151.2012;17-Oct-2025

Axis Mutual Fund

120437;INF846K01CR6;-;Axis Banking & PSU Debt Fund - Direct Plan - Growth Option;2612.3441;17-Oct-2025
999999;N.A.;N.A.;Wound up scheme;N.A.;
";

    const HISTORY: &str = "\
Scheme Code;Scheme Name;ISIN Div Payout/ISIN Growth;ISIN Div Reinvestment;Net Asset Value;Repurchase Price;Sale Price;Date

Open Ended Schemes ( Debt Scheme - Banking and PSU Fund )

Aditya Birla Sun Life Mutual Fund

119551;Aditya Birla Sun Life Banking & PSU Debt Fund  - DIRECT - IDCW;INF209KA12Z1;INF209KA13Z9;104.8001;;;01-Oct-2025
119551;Aditya Birla Sun Life Banking & PSU Debt Fund  - DIRECT - IDCW;INF209KA12Z1;INF209KA13Z9;104.8512;;;03-Oct-2025
120437;Axis Banking & PSU Debt Fund - Direct Plan - Growth Option;INF846K01CR6;;N.A.;;;01-Oct-2025
";

    #[test]
    fn test_parse_listing_reads_rows() {
        let listings = parse_listing(LISTING).unwrap();
        let codes: Vec<&str> = listings.iter().map(|l| l.symbol.as_str()).collect();
        assert_eq!(codes, vec!["119551", "108272", "120437"]);

        let first = &listings[0];
        assert_eq!(
            first.metadata.name,
            "Aditya Birla Sun Life Banking & PSU Debt Fund  - DIRECT - IDCW"
        );
        assert_eq!(first.metadata.category, InstrumentCategory::MutualFund);
        assert_eq!(first.metadata.isin.as_deref(), Some("INF209KA12Z1"));
    }

    #[test]
    fn test_parse_listing_falls_back_to_reinvestment_isin() {
        let listings = parse_listing(LISTING).unwrap();
        assert_eq!(listings[1].metadata.isin.as_deref(), Some("INF209K01LE0"));
    }

    #[test]
    fn test_parse_listing_tracks_sections() {
        let listings = parse_listing(LISTING).unwrap();
        let axis = &listings[2].metadata;
        assert_eq!(
            axis.attributes.get(ATTR_FUND_HOUSE).map(String::as_str),
            Some("Axis Mutual Fund")
        );
        assert_eq!(
            axis.attributes.get(ATTR_SCHEME_TYPE).map(String::as_str),
            Some("Open Ended Schemes(Debt Scheme - Banking and PSU Fund)")
        );
    }

    #[test]
    fn test_parse_navs_skips_missing_values() {
        let rows = parse_navs(HISTORY).unwrap();
        assert_eq!(
            rows,
            vec![
                NavRow {
                    scheme_code: "119551".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
                    nav: dec!(104.8001),
                },
                NavRow {
                    scheme_code: "119551".to_string(),
                    date: NaiveDate::from_ymd_opt(2025, 10, 3).unwrap(),
                    nav: dec!(104.8512),
                },
            ]
        );
    }

    #[test]
    fn test_parse_navs_reads_listing_layout() {
        let rows = parse_navs(LISTING).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].nav, dec!(2612.3441));
    }

    #[test]
    fn test_missing_header_is_parse_error() {
        let err = parse_navs("<html>Service Unavailable</html>").unwrap_err();
        assert!(matches!(err, MarketDataError::Parse(_)));
    }

    #[test]
    fn test_format_report_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(format_report_date(date), "05-Jan-2025");
    }
}
