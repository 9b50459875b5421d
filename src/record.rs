use crate::provider::PublicationStub;

/// Separator between author names in provider records.
pub const AUTHOR_DELIMITER: &str = " and ";

/// A publication as it is written to the year pages. Every field is set; anything
/// the provider did not report is an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    pub year: i32,
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub volume: String,
    pub number: String,
    pub pages: String,
    pub url: String,
}

impl PublicationRecord {
    /// Build a record from an enriched stub. `year` is the value that passed the
    /// year gate for this stub.
    pub fn from_stub(year: i32, stub: &PublicationStub) -> Self {
        let bib = &stub.bib;
        let or_empty = |v: &Option<String>| v.clone().unwrap_or_default();
        PublicationRecord {
            year,
            title: bib.title.clone(),
            authors: reshape_authors(bib.author.as_deref().unwrap_or_default()),
            journal: or_empty(&bib.journal),
            volume: or_empty(&bib.volume),
            number: or_empty(&bib.number),
            pages: or_empty(&bib.pages),
            url: or_empty(&stub.url),
        }
    }

    /// `JOURNAL VOLUME, NUMBER PAGES (YEAR)`, empty parts included as-is.
    pub fn citation(&self) -> String {
        format!(
            "{} {}, {} {} ({})",
            self.journal, self.volume, self.number, self.pages, self.year
        )
    }
}

/// Turn `"A and B and C"` into `"A, B and C"`: every separator but the last
/// becomes a comma.
pub fn reshape_authors(raw: &str) -> String {
    let parts: Vec<&str> = raw.split(AUTHOR_DELIMITER).collect();
    match parts.split_last() {
        Some((last, init)) if !init.is_empty() => {
            format!("{}{}{}", init.join(", "), AUTHOR_DELIMITER, last)
        }
        _ => raw.to_string(),
    }
}

/// Outcome of checking a stub's year against the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearGate {
    Keep(i32),
    Missing,
    Malformed,
    TooOld(i32),
}

impl YearGate {
    pub fn check(year: Option<&str>, min_year: i32) -> Self {
        let Some(raw) = year else {
            return YearGate::Missing;
        };
        match raw.trim().parse::<i32>() {
            Err(_) => YearGate::Malformed,
            Ok(y) if y <= min_year => YearGate::TooOld(y),
            Ok(y) => YearGate::Keep(y),
        }
    }
}

/// Records grouped by year. Buckets appear in the order their first record was
/// added and keep their records in insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct YearBuckets {
    buckets: Vec<(i32, Vec<PublicationRecord>)>,
}

impl YearBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PublicationRecord) {
        match self.buckets.iter_mut().find(|(y, _)| *y == record.year) {
            Some((_, records)) => records.push(record),
            None => self.buckets.push((record.year, vec![record])),
        }
    }

    #[cfg(test)]
    pub fn get(&self, year: i32) -> Option<&[PublicationRecord]> {
        self.buckets
            .iter()
            .find(|(y, _)| *y == year)
            .map(|(_, r)| r.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &[PublicationRecord])> {
        self.buckets.iter().map(|(y, r)| (*y, r.as_slice()))
    }

    pub fn years(&self) -> Vec<i32> {
        self.buckets.iter().map(|(y, _)| *y).collect()
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of records across all buckets.
    #[cfg(test)]
    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(|(_, r)| r.len()).sum()
    }
}
