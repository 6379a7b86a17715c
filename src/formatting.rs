//! Display formatting for prices, quantities and text shown to shoppers and
//! store administrators. All output uses US English conventions.

use chrono::{DateTime, Utc};

/// Currency display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimal_places: usize,
}

pub const DEFAULT_CURRENCY: &str = "USD";

pub const SUPPORTED_CURRENCIES: &[Currency] = &[
    Currency {
        code: "USD",
        symbol: "$",
        name: "US Dollar",
        decimal_places: 2,
    },
    Currency {
        code: "EUR",
        symbol: "€",
        name: "Euro",
        decimal_places: 2,
    },
    Currency {
        code: "GBP",
        symbol: "£",
        name: "British Pound",
        decimal_places: 2,
    },
    Currency {
        code: "CAD",
        symbol: "C$",
        name: "Canadian Dollar",
        decimal_places: 2,
    },
    Currency {
        code: "AUD",
        symbol: "A$",
        name: "Australian Dollar",
        decimal_places: 2,
    },
    Currency {
        code: "JPY",
        symbol: "¥",
        name: "Japanese Yen",
        decimal_places: 0,
    },
];

/// Looks up a supported currency by ISO code (case-insensitive).
pub fn currency(code: &str) -> Option<&'static Currency> {
    SUPPORTED_CURRENCIES
        .iter()
        .find(|currency| currency.code.eq_ignore_ascii_case(code))
}

/// Formats an amount such as `$1,234.56`. Unsupported codes render as `XYZ 1,234.56`.
pub fn format_price(amount: f64, currency_code: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    match currency(currency_code) {
        Some(currency) => format!(
            "{sign}{}{}",
            currency.symbol,
            format_fixed_grouped(amount.abs(), currency.decimal_places)
        ),
        None => format!(
            "{sign}{} {}",
            currency_code.to_ascii_uppercase(),
            format_fixed_grouped(amount.abs(), 2)
        ),
    }
}

/// `$10.00 - $20.00`, or a single price when both ends match.
pub fn format_price_range(min: f64, max: f64, currency_code: &str) -> String {
    if min == max {
        return format_price(min, currency_code);
    }
    format!(
        "{} - {}",
        format_price(min, currency_code),
        format_price(max, currency_code)
    )
}

pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}%")
}

/// Human readable byte counts using binary multiples.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    format!("{} {}", trim_decimal(&format!("{value:.2}")), UNITS[exponent])
}

/// Thousands separators with up to three fraction digits, e.g. `1,234,567.891`.
pub fn format_number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let rendered = format_fixed_grouped(value.abs(), 3);
    format!("{sign}{}", trim_decimal(&rendered))
}

/// Compact notation: `1.5K`, `2.0M`.
pub fn format_number_abbreviation(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        value.to_string()
    }
}

/// `(555) 123-4567` for ten digit numbers; anything else is returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 {
        return phone.to_string();
    }
    format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..])
}

/// Masks all but the last four digits.
pub fn format_credit_card(card_number: &str) -> String {
    let cleaned: Vec<char> = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    let visible_from = cleaned.len().saturating_sub(4);
    let last_four: String = cleaned[visible_from..].iter().collect();
    format!("{}{last_four}", "*".repeat(visible_from))
}

/// URL slug: lowercase, punctuation dropped, runs of whitespace, `_` and `-` collapsed to `-`.
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
    }

    slug
}

pub fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cuts after `max_length` characters and appends `...`.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_length).collect();
    format!("{truncated}...")
}

/// `Jan 05, 2024`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

/// `Jan 05, 2024 at 3:07 PM`
pub fn format_date_time(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y at %-I:%M %p").to_string()
}

fn format_fixed_grouped(value: f64, decimals: usize) -> String {
    let rendered = format!("{value:.decimals$}");
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}

fn trim_decimal(rendered: &str) -> String {
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered.to_string()
    }
}
