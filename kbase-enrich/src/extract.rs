//! Pure text extractors used by the source adapters
//!
//! Each rule is a standalone function. Adapters hold ordered slices of them
//! and take the first match.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

/// Summaries keep at most this many sentences
pub const MAX_SENTENCES: usize = 3;

/// Lowest and highest year accepted from loose url tokens
const YEAR_BOUNDS: (u16, u16) = (1990, 2030);

static ARXIV_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"arxiv\.org/(?:abs|pdf|html)/(\d+\.\d+)(?:v\d+)?").unwrap());
static BARE_ARXIV_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+)").unwrap());

static ANTHOLOGY_ID_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4})\.\w+").unwrap());
static LEGACY_ID_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[A-Z](\d{2})-\d+").unwrap());
static DELIMITED_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\-_.](\d{4})[/\-_.]").unwrap());
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4})/?$").unwrap());

static ACL_ABSTRACT_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="acl-abstract"[^>]*>.*?<span[^>]*>(.*?)</span>"#).unwrap()
});
static CARD_ABSTRACT_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="card-body acl-abstract"[^>]*>.*?<span[^>]*>(.*?)</span>"#)
        .unwrap()
});
static ABSTRACT_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<abstract[^>]*>(.*?)</abstract>").unwrap());
static ABSTRACT_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h\d[^>]*>Abstract</h\d>\s*<p>(.*?)</p>").unwrap());

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static PEOPLE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a[^>]*href="/people/[^"]*"[^>]*>([^<]+)</a>"#).unwrap());
static ID_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+\.\d+\]\s*").unwrap());

/// Year rule applied to a url
pub type YearMatcher = fn(&str) -> Option<u16>;

/// Abstract rule applied to a page; returns the raw (markup) capture
pub type AbstractMatcher = fn(&str) -> Option<String>;

/// Rules for anthology-hosted papers
pub const ANTHOLOGY_YEAR_MATCHERS: &[YearMatcher] = &[anthology_id_year, legacy_id_year];

/// Full fallback chain for papers without a structured source
pub const URL_YEAR_MATCHERS: &[YearMatcher] = &[
    anthology_id_year,
    legacy_id_year,
    delimited_year,
    trailing_year,
];

pub const ABSTRACT_MATCHERS: &[AbstractMatcher] = &[
    acl_abstract_div,
    card_abstract_div,
    abstract_element,
    abstract_heading,
];

/// arXiv identifier from an `arxiv.org/{abs,pdf,html}/...` url, version stripped
pub fn extract_arxiv_id(url: &str) -> Option<String> {
    ARXIV_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// arXiv identifier from a feed entry id such as `http://arxiv.org/abs/2402.12329v1`
pub fn arxiv_id_from_entry(entry_id: &str) -> Option<String> {
    BARE_ARXIV_ID
        .captures(entry_id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Guess a title from the last path segment of a url
///
/// `.../attention-is_all%20you.pdf` becomes `attention is all you`. Returns
/// `None` for unparseable urls and urls without a path.
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(last).ok()?;
    let spaced = decoded.replace(['-', '_'], " ");
    let stem = match spaced.rfind('.') {
        Some(dot) if dot > 0 => &spaced[..dot],
        _ => spaced.as_str(),
    };
    let title = collapse_whitespace(stem);
    (!title.is_empty()).then_some(title)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and keep the first `max` sentences
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace.
pub fn truncate_to_sentences(text: &str, max: usize) -> String {
    let text = collapse_whitespace(text);
    if max == 0 {
        return String::new();
    }

    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') && matches!(chars.peek(), Some((_, ' '))) {
            seen += 1;
            if seen == max {
                return text[..i + c.len_utf8()].to_string();
            }
        }
    }
    text
}

/// Two-digit year pivot: below 50 is 20xx, otherwise 19xx
pub fn pivot_two_digit_year(yy: u16) -> u16 {
    if yy < 50 {
        2000 + yy
    } else {
        1900 + yy
    }
}

fn in_bounds(year: u16) -> bool {
    (YEAR_BOUNDS.0..=YEAR_BOUNDS.1).contains(&year)
}

/// `/2024.emnlp-main.557`
pub fn anthology_id_year(url: &str) -> Option<u16> {
    ANTHOLOGY_ID_YEAR
        .captures(url)
        .and_then(|c| c[1].parse().ok())
}

/// `/D15-1013`
pub fn legacy_id_year(url: &str) -> Option<u16> {
    LEGACY_ID_YEAR
        .captures(url)
        .and_then(|c| c[1].parse().ok())
        .map(pivot_two_digit_year)
}

/// Any in-range `dddd` between `/ - _ .` delimiters
pub fn delimited_year(url: &str) -> Option<u16> {
    let mut pos = 0;
    while let Some(caps) = DELIMITED_YEAR.captures_at(url, pos) {
        let token = caps.get(1)?;
        if let Ok(year) = token.as_str().parse() {
            if in_bounds(year) {
                return Some(year);
            }
        }
        // closing delimiter may open the next token
        pos = token.end();
    }
    None
}

/// In-range `dddd` closing the path
pub fn trailing_year(url: &str) -> Option<u16> {
    TRAILING_YEAR
        .captures(url)
        .and_then(|c| c[1].parse().ok())
        .filter(|year| in_bounds(*year))
}

pub fn first_year(url: &str, matchers: &[YearMatcher]) -> Option<u16> {
    matchers.iter().find_map(|matcher| matcher(url))
}

/// Year-only dates are pinned to January 1st
pub fn year_to_date(year: u16) -> String {
    format!("{year:04}-01-01")
}

fn capture_first(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn acl_abstract_div(html: &str) -> Option<String> {
    capture_first(&ACL_ABSTRACT_DIV, html)
}

pub fn card_abstract_div(html: &str) -> Option<String> {
    capture_first(&CARD_ABSTRACT_DIV, html)
}

pub fn abstract_element(html: &str) -> Option<String> {
    capture_first(&ABSTRACT_ELEMENT, html)
}

pub fn abstract_heading(html: &str) -> Option<String> {
    capture_first(&ABSTRACT_HEADING, html)
}

pub fn strip_markup(text: &str) -> String {
    MARKUP.replace_all(text, "").trim().to_string()
}

/// Abstract from a paper page: first matching rule, markup stripped, truncated
pub fn extract_abstract(html: &str) -> Option<String> {
    let raw = ABSTRACT_MATCHERS.iter().find_map(|matcher| matcher(html))?;
    let text = truncate_to_sentences(&strip_markup(&raw), MAX_SENTENCES);
    (!text.is_empty()).then_some(text)
}

/// Author names from `/people/...` profile links, in page order
pub fn extract_people_links(html: &str) -> Option<Vec<String>> {
    let authors: Vec<String> = PEOPLE_LINK
        .captures_iter(html)
        .map(|c| c[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    (!authors.is_empty()).then_some(authors)
}

/// Feed titles are sometimes prefixed with `[<id>]`
pub fn clean_title(title: &str) -> String {
    let title = collapse_whitespace(title);
    ID_PREFIX.replace(&title, "").to_string()
}
