pub mod scholar;

/// A matched author in the provider's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    pub id: String,
    /// Name as the provider displays it. Only used for logging.
    pub name: String,
}

/// Bibliographic fields of a stub. Everything but the title may be missing until
/// the stub has been enriched, and some fields stay missing afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bib {
    pub title: String,
    pub year: Option<String>,
    /// Author names joined with `" and "`.
    pub author: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub pages: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationStub {
    /// Provider key used to request the full record.
    pub id: String,
    pub bib: Bib,
    pub url: Option<String>,
    pub filled: bool,
}

/// Parts of a stub the provider can fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Bib,
    Url,
}

/// An author and publication lookup service.
pub trait Provider {
    /// Candidate identities for a free-text query, best match first. May be empty.
    fn search_author(&self, query: &str) -> anyhow::Result<Vec<AuthorIdentity>>;

    /// Every publication listed for `author`, in the provider's order.
    fn publications(&self, author: &AuthorIdentity) -> anyhow::Result<Vec<PublicationStub>>;

    /// A copy of `stub` with the requested `sections` filled in.
    fn enrich(
        &self,
        stub: &PublicationStub,
        sections: &[Section],
    ) -> anyhow::Result<PublicationStub>;
}
