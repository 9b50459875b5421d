use std::{borrow::Cow, collections::HashSet};

use anyhow::{Context, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Config,
    provider::{AuthorIdentity, Bib, Provider, PublicationStub, Section},
};

/// Rows requested per profile page; the largest page size the site serves.
const PAGE_SIZE: usize = 100;

/// Upper bound on profile pages fetched for one author.
const MAX_PAGES: usize = 100;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.10 Safari/605.1.1";

/// Google Scholar profiles, scraped over a blocking HTTP agent.
pub struct Scholar {
    agent: ureq::Agent,
    base: Url,
}

impl Scholar {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).with_context(|| format!("invalid base URL {base}"))?;

        let proxy = match &config.proxy {
            Some(p) => {
                Some(ureq::Proxy::new(p).with_context(|| format!("invalid proxy URL {p}"))?)
            }
            None => ureq::Proxy::try_from_env(),
        };
        let cfg = ureq::Agent::config_builder()
            .timeout_global(config.timeout())
            .proxy(proxy)
            .build();

        Ok(Scholar {
            agent: ureq::Agent::new_with_config(cfg),
            base,
        })
    }

    fn citations_url(&self, params: &[(&str, &str)]) -> anyhow::Result<Url> {
        let mut url = self.base.join("citations")?;
        url.query_pairs_mut()
            .append_pair("hl", "en")
            .extend_pairs(params);
        Ok(url)
    }

    fn fetch(&self, url: &Url) -> anyhow::Result<String> {
        debug!(%url, "GET");
        let body = self
            .agent
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en")
            .call()
            .with_context(|| format!("failed request for URL {url}"))?
            .into_body()
            .read_to_string()
            .context("failed to read response body")?;
        if is_blocked(&body) {
            bail!("provider refused the request as automated traffic: {url}");
        }
        Ok(body)
    }
}

impl Provider for Scholar {
    fn search_author(&self, query: &str) -> anyhow::Result<Vec<AuthorIdentity>> {
        let url = self.citations_url(&[("view_op", "search_authors"), ("mauthors", query)])?;
        let html = self
            .fetch(&url)
            .with_context(|| format!("author search failed for query {query:?}"))?;
        Ok(parse_author_search(&html, &self.base))
    }

    fn publications(&self, author: &AuthorIdentity) -> anyhow::Result<Vec<PublicationStub>> {
        let page_size = PAGE_SIZE.to_string();
        let out = collect_pages(|cstart| {
            let cstart = cstart.to_string();
            let url = self.citations_url(&[
                ("user", author.id.as_str()),
                ("cstart", cstart.as_str()),
                ("pagesize", page_size.as_str()),
            ])?;
            let html = self.fetch(&url)?;
            Ok(parse_publication_rows(&html))
        })
        .with_context(|| format!("failed to list publications of {}", author.name))?;
        debug!(author = %author.name, count = out.len(), "publications listed");
        Ok(out)
    }

    fn enrich(
        &self,
        stub: &PublicationStub,
        sections: &[Section],
    ) -> anyhow::Result<PublicationStub> {
        let url = self.citations_url(&[
            ("view_op", "view_citation"),
            ("citation_for_view", stub.id.as_str()),
        ])?;
        let html = self
            .fetch(&url)
            .with_context(|| format!("failed to enrich publication {}", stub.id))?;
        Ok(apply_citation_page(stub, &parse_citation_page(&html, &self.base), sections))
    }
}

/// Page through a profile listing, `fetch_page` being called with the row
/// offset to start from. Stops at the first short page, or at a page that adds no
/// unseen publication ids (a server that ignores the offset).
fn collect_pages<F>(mut fetch_page: F) -> anyhow::Result<Vec<PublicationStub>>
where
    F: FnMut(usize) -> anyhow::Result<Vec<PublicationStub>>,
{
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut cstart = 0;
    for _ in 0..MAX_PAGES {
        let page = fetch_page(cstart)?;
        let rows = page.len();
        let before = out.len();
        out.extend(page.into_iter().filter(|stub| seen.insert(stub.id.clone())));
        if rows < PAGE_SIZE {
            return Ok(out);
        }
        if out.len() == before {
            warn!(cstart, "listing page repeats earlier rows, stopping");
            return Ok(out);
        }
        cstart += rows;
    }
    bail!("listing did not end after {MAX_PAGES} pages")
}

/// Everything the citation view page tells us about one publication.
#[derive(Debug, Default, PartialEq, Eq)]
struct CitationPage {
    title: Option<String>,
    url: Option<String>,
    authors: Option<String>,
    journal: Option<String>,
    volume: Option<String>,
    number: Option<String>,
    pages: Option<String>,
    year: Option<String>,
}

fn apply_citation_page(
    stub: &PublicationStub,
    page: &CitationPage,
    sections: &[Section],
) -> PublicationStub {
    let mut out = stub.clone();
    if sections.contains(&Section::Bib) {
        let bib = &mut out.bib;
        if let Some(title) = &page.title {
            bib.title = title.clone();
        }
        // Keep whatever the listing gave us when the page lacks a field.
        fn merge(slot: &mut Option<String>, found: &Option<String>) {
            if found.is_some() {
                *slot = found.clone();
            }
        }
        merge(&mut bib.author, &page.authors);
        merge(&mut bib.journal, &page.journal);
        merge(&mut bib.volume, &page.volume);
        merge(&mut bib.number, &page.number);
        merge(&mut bib.pages, &page.pages);
        merge(&mut bib.year, &page.year);
    }
    if sections.contains(&Section::Url) && page.url.is_some() {
        out.url = page.url.clone();
    }
    out.filled = true;
    out
}

// ----------------------------
// Page parsers
// ----------------------------

static AUTHOR_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<h3\b[^>]*class="gs_ai_name"[^>]*>\s*<a\b[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .unwrap()
});
static PUB_ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<tr\b[^>]*class="gsc_a_tr"[^>]*>(.*?)</tr>"#).unwrap());
static PUB_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\b[^>]*class="gsc_a_at"[^>]*>(.*?)</a>"#).unwrap());
static PUB_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"citation_for_view=([^"&#\s]+)"#).unwrap());
static PUB_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<span\b[^>]*class="gsc_a_h\b[^"]*"[^>]*>(.*?)</span>"#).unwrap());
static OCI_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<div\b[^>]*id="gsc_oci_title"[^>]*>(.*?)</div>"#).unwrap());
static OCI_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\b[^>]*class="gsc_oci_title_link"[^>]*>"#).unwrap());
static OCI_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<div\b[^>]*class="gsc_oci_field"[^>]*>(.*?)</div>\s*<div\b[^>]*class="gsc_oci_value"[^>]*>(.*?)</div>"#,
    )
    .unwrap()
});
static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static CAPTCHA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<[a-z]+\b[^>]*\b(?:id|class)\s*=\s*["'][^"']*\b(?:gs_captcha\w*|g-recaptcha)\b"#)
        .unwrap()
});
static LEADING_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{4})").unwrap());

/// The site answers automated traffic with a CAPTCHA form instead of the page.
fn is_blocked(html: &str) -> bool {
    CAPTCHA_RE.is_match(html)
}

fn parse_author_search(html: &str, base: &Url) -> Vec<AuthorIdentity> {
    AUTHOR_NAME_RE
        .captures_iter(html)
        .filter_map(|c| {
            let href = unescape(c.get(1)?.as_str());
            let id = absolutise(base, &href)
                .ok()?
                .query_pairs()
                .find(|(k, _)| k == "user")
                .map(|(_, v)| v.into_owned())?;
            Some(AuthorIdentity {
                id,
                name: text_of(c.get(2)?.as_str()),
            })
        })
        .collect()
}

fn parse_publication_rows(html: &str) -> Vec<PublicationStub> {
    PUB_ROW_RE
        .captures_iter(html)
        .filter_map(|row| {
            let row = row.get(1)?.as_str();
            let id = PUB_ID_RE.captures(row)?.get(1)?.as_str();
            let title = text_of(PUB_TITLE_RE.captures(row)?.get(1)?.as_str());
            let year = PUB_YEAR_RE
                .captures(row)
                .and_then(|c| c.get(1))
                .map(|m| text_of(m.as_str()))
                .filter(|y| !y.is_empty());
            Some(PublicationStub {
                id: unescape(id).into_owned(),
                bib: Bib {
                    title,
                    year,
                    ..Bib::default()
                },
                url: None,
                filled: false,
            })
        })
        .collect()
}

fn parse_citation_page(html: &str, base: &Url) -> CitationPage {
    let mut page = CitationPage {
        title: OCI_TITLE_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| text_of(m.as_str()))
            .filter(|t| !t.is_empty()),
        url: OCI_LINK_RE.find(html).and_then(|tag| {
            let caps = HREF_RE.captures(tag.as_str())?;
            let href = caps.get(1).or_else(|| caps.get(2))?.as_str();
            absolutise(base, &unescape(href)).ok().map(String::from)
        }),
        ..CitationPage::default()
    };

    let mut venue: [Option<String>; 4] = Default::default();
    for caps in OCI_FIELD_RE.captures_iter(html) {
        let (Some(field), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = text_of(value.as_str());
        if value.is_empty() {
            continue;
        }
        match text_of(field.as_str()).to_ascii_lowercase().as_str() {
            "authors" | "inventors" => page.authors = Some(join_authors(&value)),
            "journal" => venue[0] = Some(value),
            "conference" => venue[1] = Some(value),
            "book" => venue[2] = Some(value),
            "source" => venue[3] = Some(value),
            "volume" => page.volume = Some(value),
            "issue" => page.number = Some(value),
            "pages" => page.pages = Some(value),
            "publication date" => {
                page.year = LEADING_YEAR_RE
                    .captures(&value)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
            }
            _ => {}
        }
    }
    page.journal = venue.into_iter().flatten().next();
    page
}

// ----------------------------
// Helpers
// ----------------------------

/// The site lists authors as "A, B, C"; records carry them as "A and B and C".
fn join_authors(list: &str) -> String {
    list.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(" and ")
}

fn absolutise(base: &Url, cand: &str) -> anyhow::Result<Url> {
    if let Ok(u) = Url::parse(cand) {
        return Ok(u);
    }
    base.join(cand).map_err(|e| e.into())
}

fn unescape(s: &str) -> Cow<'_, str> {
    if let Ok(out) = quick_xml::escape::unescape(s) {
        return out;
    }
    // HTML-only entities the XML unescaper does not know about.
    let patched = s.replace("&nbsp;", " ").replace("&hellip;", "…");
    match quick_xml::escape::unescape(&patched) {
        Ok(out) => Cow::Owned(out.into_owned()),
        Err(_) => Cow::Owned(patched),
    }
}

/// Visible text of an HTML snippet: tags dropped, entities decoded, whitespace collapsed.
fn text_of(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, "");
    normalize_ws(&unescape(&stripped))
}

fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
