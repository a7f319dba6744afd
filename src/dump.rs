//! Streaming `<page>` scanner for MediaWiki XML dumps.
//!
//! The dump is never parsed as XML: complete `<page>…</page>` spans are cut
//! out of a rolling buffer and the few fields we need are picked out with
//! regexes.

use std::io::BufRead;

use lazy_static::lazy_static;
use regex::Regex;

use crate::clean::decode_entities;
use crate::error::Result;

lazy_static! {
    static ref TITLE_PATTERN: Regex = Regex::new(r"<title>([^<]+)</title>").unwrap();
    static ref NS_PATTERN: Regex = Regex::new(r"<ns>(-?\d+)</ns>").unwrap();
    static ref TEXT_PATTERN: Regex = Regex::new(r"(?s)<text[^>]*>(.+?)</text>").unwrap();
    static ref REDIRECT_PATTERN: Regex = Regex::new(r#"<redirect\s+title="[^"]+""#).unwrap();
}

const CHUNK_SIZE: usize = 1024 * 1024;

/// An article page ready to be walked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// Position of the page in the dump, starting at 0.
    pub page_id: usize,
    pub title: String,
    pub text: String,
}

/// What one `<page>` element turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannedPage {
    Article(RawPage),
    Redirect { title: String },
    NonArticle { title: String, namespace: i64 },
    /// No title or no text.
    Malformed,
}

/// Classify one `<page>…</page>` span. Titles and text come back with their
/// XML entities decoded.
pub fn read_page(page_xml: &str, page_id: usize) -> ScannedPage {
    let title = match TITLE_PATTERN.captures(page_xml) {
        Some(cap) => decode_entities(&cap[1]),
        None => return ScannedPage::Malformed,
    };

    if let Some(cap) = NS_PATTERN.captures(page_xml) {
        let namespace = cap[1].parse().unwrap_or(-1);
        if namespace != 0 {
            return ScannedPage::NonArticle { title, namespace };
        }
    }

    if REDIRECT_PATTERN.is_match(page_xml) {
        return ScannedPage::Redirect { title };
    }

    match TEXT_PATTERN.captures(page_xml) {
        Some(cap) => ScannedPage::Article(RawPage {
            page_id,
            title,
            text: decode_entities(&cap[1]),
        }),
        None => ScannedPage::Malformed,
    }
}

/// Feed every complete `<page>` span to `callback` in dump order. Scanning
/// stops early when the callback returns `false`.
///
/// Bytes are decoded as UTF-8 only up to the last complete character of a
/// chunk; a character split across two reads is carried over.
pub fn scan_pages(mut reader: impl BufRead, mut callback: impl FnMut(String) -> bool) -> Result<()> {
    let mut buffer = String::new();
    let mut carry: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut chunk)?;
        if bytes_read == 0 {
            break;
        }

        carry.extend_from_slice(&chunk[..bytes_read]);
        let valid = match std::str::from_utf8(&carry) {
            Ok(text) => text.len(),
            // an invalid sequence, not a truncated one: let the lossy decode replace it
            Err(err) if err.error_len().is_some() => carry.len(),
            Err(err) => err.valid_up_to(),
        };
        buffer.push_str(&String::from_utf8_lossy(&carry[..valid]));
        carry.drain(..valid);

        while let Some(start) = buffer.find("<page>") {
            if let Some(end_offset) = buffer[start..].find("</page>") {
                let end = start + end_offset + "</page>".len();
                let page_xml = buffer[start..end].to_string();
                buffer.drain(..end);

                if !callback(page_xml) {
                    return Ok(());
                }
            } else {
                buffer.drain(..start);
                break;
            }
        }

        // keep a tail in case "<page>" straddles the chunk boundary
        if buffer.len() > 10 && !buffer.contains("<page>") {
            let mut cut = buffer.len() - 10;
            while !buffer.is_char_boundary(cut) {
                cut -= 1;
            }
            buffer.drain(..cut);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    fn page(title: &str, ns: i64, body: &str) -> String {
        format!(
            "<page>\n<title>{}</title>\n<ns>{}</ns>\n<id>1</id>\n<revision>\n{}\n</revision>\n</page>\n",
            title, ns, body
        )
    }

    fn collect(xml: &str) -> Vec<String> {
        let mut pages = Vec::new();
        scan_pages(xml.as_bytes(), |p| {
            pages.push(p);
            true
        })
        .unwrap();
        pages
    }

    // ─── read_page ───

    #[test]
    fn article_with_entities() {
        let xml = page(
            "kucing &amp; anjing",
            0,
            "<text bytes=\"30\" xml:space=\"preserve\">==Bahasa Melayu==\n# &lt;b&gt; &quot;x&quot;</text>",
        );
        match read_page(&xml, 7) {
            ScannedPage::Article(raw) => {
                assert_eq!(raw.page_id, 7);
                assert_eq!(raw.title, "kucing & anjing");
                assert_eq!(raw.text, "==Bahasa Melayu==\n# <b> \"x\"");
            }
            other => panic!("expected article, got {:?}", other),
        }
    }

    #[test]
    fn redirects_and_other_namespaces() {
        let redirect = page("Kucing", 0, "<redirect title=\"kucing\" /><text>#REDIRECT [[kucing]]</text>");
        assert_eq!(
            read_page(&redirect, 0),
            ScannedPage::Redirect { title: "Kucing".into() }
        );
        let template = page("Templat:lb", 10, "<text>{{{1}}}</text>");
        assert_eq!(
            read_page(&template, 0),
            ScannedPage::NonArticle {
                title: "Templat:lb".into(),
                namespace: 10
            }
        );
    }

    #[test]
    fn empty_text_is_malformed() {
        let xml = page("kosong", 0, "<text bytes=\"0\" />");
        assert_eq!(read_page(&xml, 0), ScannedPage::Malformed);
        assert_eq!(read_page("<page></page>", 0), ScannedPage::Malformed);
    }

    // ─── scan_pages ───

    #[test]
    fn pages_come_out_in_order() {
        let xml = format!(
            "<mediawiki>\n<siteinfo></siteinfo>\n{}{}</mediawiki>",
            page("a", 0, "<text>x</text>"),
            page("b", 0, "<text>y</text>")
        );
        let pages = collect(&xml);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("<title>a</title>"));
        assert!(pages[1].contains("<title>b</title>"));
    }

    #[test]
    fn callback_can_stop_the_scan() {
        let xml = format!("{}{}{}", page("a", 0, ""), page("b", 0, ""), page("c", 0, ""));
        let mut seen = 0;
        scan_pages(xml.as_bytes(), |_| {
            seen += 1;
            seen < 2
        })
        .unwrap();
        assert_eq!(seen, 2);
    }

    /// Hands out its data a few bytes at a time, splitting characters.
    struct Trickle<'a> {
        data: &'a [u8],
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn characters_split_across_reads_survive() {
        let xml = page("กิน", 0, "<text>==ภาษาไทย==</text>");
        let mut pages = Vec::new();
        let reader = BufReader::new(Trickle { data: xml.as_bytes() });
        scan_pages(reader, |p| {
            pages.push(p);
            true
        })
        .unwrap();
        assert_eq!(pages.len(), 1);
        match read_page(&pages[0], 0) {
            ScannedPage::Article(raw) => {
                assert_eq!(raw.title, "กิน");
                assert_eq!(raw.text, "==ภาษาไทย==");
            }
            other => panic!("expected article, got {:?}", other),
        }
    }
}
