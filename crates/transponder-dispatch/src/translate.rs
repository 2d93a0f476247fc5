use transponder_types::QuerySpec;

/// Selects (and may rewrite) the query text to run for a driver dialect.
///
/// The strategy catalog snapshots the translator when it is built, so a
/// compiled dispatch keeps the translator it was compiled with. Swapping the
/// translator therefore requires recompiling.
pub trait QueryTranslator: Send + Sync {
    fn name(&self) -> &str;

    /// Pick a query among `candidates` (declaration order) for `dialect`.
    fn translate(&self, candidates: &[&QuerySpec], dialect: &str) -> Option<QuerySpec>;
}

/// Runs query text as declared.
///
/// Prefers the first spec whose dialect equals the driver's, then the first
/// spec without a dialect.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThroughTranslator;

impl QueryTranslator for PassThroughTranslator {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn translate(&self, candidates: &[&QuerySpec], dialect: &str) -> Option<QuerySpec> {
        candidates
            .iter()
            .find(|q| q.dialect.as_deref() == Some(dialect))
            .or_else(|| candidates.iter().find(|q| q.dialect.is_none()))
            .map(|q| (*q).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_match_beats_generic() {
        let generic = QuerySpec::new("sql", "select 1");
        let pg = QuerySpec::new("sql", "select 1::int").for_dialect("postgres");
        let t = PassThroughTranslator;

        let picked = t.translate(&[&generic, &pg], "postgres").unwrap();
        assert_eq!(picked.text, "select 1::int");

        let picked = t.translate(&[&generic, &pg], "memory").unwrap();
        assert_eq!(picked.text, "select 1");
    }

    #[test]
    fn no_fit_yields_none() {
        let pg = QuerySpec::new("sql", "select 1").for_dialect("postgres");
        assert!(PassThroughTranslator.translate(&[&pg], "memory").is_none());
        assert!(PassThroughTranslator.translate(&[], "memory").is_none());
    }
}
