use std::path::PathBuf;

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

const MODIFIED_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// A file or folder found by the search service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Full path, parent directory joined with the name.
    pub path: PathBuf,
    /// Whether the entry is a folder.
    pub is_folder: bool,
    /// Size in bytes, 0 when unknown.
    pub size: u64,
    /// Last modification time, as displayed by the service.
    pub modified: NaiveDateTime,
}

/// One parsed results page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Rows of this page, in display order.
    pub results: Vec<SearchResult>,
    /// The largest offset named by the page navigation, 0 when absent.
    pub max_offset: u64,
}

/// Parses results pages, holding the compiled selectors and patterns.
pub struct PageParser {
    row: Selector,
    cell: Selector,
    nav: Selector,
    link: Selector,
    offset: Regex,
    size: Regex,
}

impl PageParser {
    /// Creates a parser.
    pub fn new() -> Self {
        // All inputs are literals, they always compile.
        let selector =
            |css: &str| Selector::parse(css).expect("selector literal");
        Self {
            row: selector("tr[class^=trdata]"),
            cell: selector("td"),
            nav: selector("span.nav"),
            link: selector("a"),
            offset: Regex::new(r"offset=(\d+)").expect("offset pattern"),
            size: Regex::new(r"^(\d+(?:\.\d+)?)(B|KB|MB|GB)")
                .expect("size pattern"),
        }
    }

    /// Parses a results page.
    ///
    /// Rows that don't have the expected cells are skipped with a warning.
    pub fn parse(&self, html: &str) -> Page {
        let document = Html::parse_document(html);

        let results = document
            .select(&self.row)
            .filter_map(|row| {
                let cells: Vec<_> = row.select(&self.cell).collect();
                let result = self.parse_row(&cells);
                if result.is_none() {
                    warn!("skipping malformed result row: {}", row.html());
                }
                result
            })
            .collect();

        let max_offset = document
            .select(&self.nav)
            .last()
            .and_then(|nav| nav.select(&self.link).next())
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| self.offset.captures(href))
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0);

        Page {
            results,
            max_offset,
        }
    }

    fn parse_row(&self, cells: &[ElementRef<'_>]) -> Option<SearchResult> {
        let [name, parent, size, modified, ..] = cells else {
            return None;
        };
        let is_folder = name.value().classes().any(|class| class == "folder");
        let path = PathBuf::from(text_of(parent)).join(text_of(name));
        let size = self.parse_size(&text_of(size));
        let modified =
            NaiveDateTime::parse_from_str(&text_of(modified), MODIFIED_FORMAT)
                .ok()?;
        Some(SearchResult {
            path,
            is_folder,
            size,
            modified,
        })
    }

    /// Parses a human-readable size such as `12.5 KB` into bytes.
    ///
    /// Units are B, KB, MB and GB in powers of 1024. Anything else is 0.
    pub fn parse_size(&self, text: &str) -> u64 {
        let normalized: String = text
            .to_uppercase()
            .chars()
            .filter(|c| *c != ' ')
            .collect();
        let Some(caps) = self.size.captures(&normalized) else {
            return 0;
        };
        let Ok(value) = caps[1].parse::<f64>() else {
            return 0;
        };
        let multiplier: u64 = match &caps[2] {
            "B" => 1,
            "KB" => 1 << 10,
            "MB" => 1 << 20,
            "GB" => 1 << 30,
            _ => return 0,
        };
        (value * multiplier as f64) as u64
    }
}

impl Default for PageParser {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a results page with a one-off [`PageParser`].
#[inline]
pub fn parse_page(html: &str) -> Page {
    PageParser::new().parse(html)
}

#[inline]
fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const PAGE: &str = r#"
<html><body>
<table>
  <tr class="columnheaders"><td>Name</td><td>Path</td><td>Size</td><td>Date Modified</td></tr>
  <tr class="trdata1">
    <td class="file"><a href="/C%3A/Users/report.pdf">report.pdf</a></td>
    <td class="pathdata"><a href="/C%3A/Users">/home/user</a></td>
    <td class="sizedata">1.5 MB</td>
    <td class="modifieddata">03/14/2024 09:26 PM</td>
  </tr>
  <tr class="trdata2">
    <td class="folder"><a href="/C%3A/Users/docs">docs</a></td>
    <td class="pathdata">/home/user</td>
    <td class="sizedata"></td>
    <td class="modifieddata">01/02/2023 12:05 AM</td>
  </tr>
  <tr class="trdata1">
    <td class="file">broken.txt</td>
    <td class="pathdata">/home/user</td>
  </tr>
</table>
<p><span class="nav"><a href="/?search=report&offset=0">1</a></span>
<span class="nav"><a href="/?search=report&offset=96">Last</a></span></p>
</body></html>
"#;

    #[test]
    fn test_parse_page() {
        let page = parse_page(PAGE);
        assert_eq!(page.max_offset, 96);
        assert_eq!(page.results.len(), 2);

        let file = &page.results[0];
        assert_eq!(file.path, PathBuf::from("/home/user").join("report.pdf"));
        assert!(!file.is_folder);
        assert_eq!(file.size, 1_572_864);
        assert_eq!(
            file.modified,
            NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(21, 26, 0)
                .unwrap()
        );

        let folder = &page.results[1];
        assert!(folder.is_folder);
        assert_eq!(folder.size, 0);
        assert_eq!(folder.modified.to_string(), "2023-01-02 00:05:00");
    }

    #[test]
    fn test_parse_page_without_nav() {
        let page = parse_page("<html><body><table></table></body></html>");
        assert_eq!(page, Page::default());
    }

    #[test]
    fn test_parse_size() {
        let parser = PageParser::new();
        assert_eq!(parser.parse_size("512 B"), 512);
        assert_eq!(parser.parse_size("12 kb"), 12 * 1024);
        assert_eq!(parser.parse_size("1.5 MB"), 1_572_864);
        assert_eq!(parser.parse_size("2GB"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parser.parse_size("3 TB"), 0);
        assert_eq!(parser.parse_size(""), 0);
        assert_eq!(parser.parse_size("about 5 KB"), 0);
    }

    #[test]
    fn test_serialize_result() {
        let result = SearchResult {
            path: PathBuf::from("/tmp/a.txt"),
            is_folder: false,
            size: 3,
            modified: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(21, 26, 0)
                .unwrap(),
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"path":"/tmp/a.txt","is_folder":false,"size":3,"modified":"2024-03-14T21:26:00"}"#
        );
    }
}
