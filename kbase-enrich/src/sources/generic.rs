//! Papers without a structured source
//!
//! No network. The only recoverable field is a publication year, read off
//! the url through the full fallback chain.

use crate::extract::{first_year, year_to_date, URL_YEAR_MATCHERS};

/// `YYYY-01-01` for the first url rule that matches, if any
pub fn url_date(url: &str) -> Option<String> {
    first_year(url, URL_YEAR_MATCHERS).map(year_to_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_date() {
        assert_eq!(
            url_date("https://proceedings.mlr.press/v139/2021.pdf").as_deref(),
            Some("2021-01-01")
        );
        assert_eq!(
            url_date("https://openreview.net/forum?id=YicbFdNTTy").as_deref(),
            None
        );
        assert_eq!(
            url_date("https://papers.nips.cc/paper_files/paper/2017/hash/3f5ee243.html")
                .as_deref(),
            Some("2017-01-01")
        );
        assert_eq!(url_date("").as_deref(), None);
    }
}
