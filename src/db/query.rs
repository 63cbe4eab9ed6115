//! The RPSL object query builder (spec.md §6), mirroring
//! `RPSLDatabaseQuery`/`RPSLDatabaseSuspendedQuery` in the original.

use std::collections::HashMap;

use ipnet::IpNet;

/// A row returned by [`super::RpslDatabase::find_objects`] or
/// [`super::SuspendedDatabase::find_objects`].
#[derive(Debug, Clone)]
pub struct RpslRow {
    pub object_class: String,
    pub rpsl_pk: String,
    pub source: String,
    pub object_text: String,
    pub parsed_data: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IpMatch {
    Exact(IpNet),
    LessSpecificOneLevel(IpNet),
}

/// Builder for a query against an RPSL object table. Each setter
/// narrows the result set; an unset filter imposes no constraint.
#[derive(Debug, Clone, Default)]
pub struct RpslObjectQuery {
    sources: Vec<String>,
    object_classes: Vec<String>,
    rpsl_pks: Vec<String>,
    ip_match: Option<IpMatch>,
    lookup_attrs: Vec<(String, String, String)>,
    first_only: bool,
}

impl RpslObjectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn object_classes(mut self, classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.object_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn rpsl_pk(mut self, pk: impl Into<String>) -> Self {
        self.rpsl_pks = vec![pk.into()];
        self
    }

    pub fn rpsl_pks(mut self, pks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.rpsl_pks = pks.into_iter().map(Into::into).collect();
        self
    }

    pub fn ip_exact(mut self, prefix: IpNet) -> Self {
        self.ip_match = Some(IpMatch::Exact(prefix));
        self
    }

    pub fn ip_less_specific_one_level(mut self, prefix: IpNet) -> Self {
        self.ip_match = Some(IpMatch::LessSpecificOneLevel(prefix));
        self
    }

    /// Add one `(object_class, attribute, value)` alternative to an
    /// OR'd set of inbound-reference lookups: a row matches this part
    /// of the query if it is of `object_class` *and* `attribute`
    /// contains `value` among its list of values. Calling this
    /// multiple times accumulates alternatives rather than narrowing —
    /// a single object can be referenced by different classes through
    /// different attributes (e.g. a `person` via `mntner.admin-c` and
    /// `role.tech-c`), and the original issues one query that is an OR
    /// across the whole set, not an AND.
    pub fn lookup_attrs_in(
        mut self,
        object_class: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.lookup_attrs.push((object_class.into(), attribute.into(), value.into()));
        self
    }

    pub fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    /// Whether `row` satisfies every filter this query carries. The
    /// in-memory test database uses this directly; a real backend
    /// would translate the same filters into SQL.
    pub fn matches(&self, row: &RpslRow) -> bool {
        if !self.sources.is_empty() && !self.sources.iter().any(|s| s == &row.source) {
            return false;
        }
        if !self.object_classes.is_empty()
            && !self.object_classes.iter().any(|c| c == &row.object_class)
        {
            return false;
        }
        if !self.rpsl_pks.is_empty() && !self.rpsl_pks.iter().any(|pk| pk == &row.rpsl_pk) {
            return false;
        }
        if let Some(ip_match) = self.ip_match {
            let Ok(row_prefix) = row.rpsl_pk.parse::<IpNet>() else {
                return false;
            };
            let matched = match ip_match {
                IpMatch::Exact(target) => row_prefix == target,
                IpMatch::LessSpecificOneLevel(target) => {
                    row_prefix.contains(&target.network())
                        && row_prefix.prefix_len() + 1 == target.prefix_len()
                }
            };
            if !matched {
                return false;
            }
        }
        if !self.lookup_attrs.is_empty() {
            let satisfied = self.lookup_attrs.iter().any(|(object_class, attribute, value)| {
                &row.object_class == object_class
                    && row
                        .parsed_data
                        .get(attribute.as_str())
                        .is_some_and(|values| values.iter().any(|v| v == value))
            });
            if !satisfied {
                return false;
            }
        }
        true
    }

    pub fn is_first_only(&self) -> bool {
        self.first_only
    }
}
