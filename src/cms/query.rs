//! Strapi REST query builder.
//!
//! Strapi expects nested objects encoded with bracket notation, e.g.
//! `filters[slug][$eq]=foo` or `populate[author][fields][0]=name`. The builder
//! keeps the pairs in insertion order so the same query always produces the
//! same query string (and therefore the same cache fingerprint).

use sha2::{Digest, Sha256};
use url::form_urlencoded;

/// Filter operators understood by the Strapi REST API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    In,
    Contains,
    ContainsI,
    Lt,
    Lte,
    Gt,
    Gte,
    Null,
    NotNull,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::In => "$in",
            FilterOp::Contains => "$contains",
            FilterOp::ContainsI => "$containsi",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::Null => "$null",
            FilterOp::NotNull => "$notNull",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Publication status filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Published,
    Draft,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrapiQuery {
    pairs: Vec<(String, String)>,
    sort_count: usize,
    field_count: usize,
}

fn bracketed(root: &str, path: &[&str]) -> String {
    let mut key = root.to_string();
    for segment in path {
        key.push('[');
        key.push_str(segment);
        key.push(']');
    }
    key
}

impl StrapiQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, key: String, value: impl ToString) -> Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    /// `filters[a][b][$op]=value`
    pub fn filter(self, path: &[&str], op: FilterOp, value: impl ToString) -> Self {
        let key = format!("{}[{}]", bracketed("filters", path), op.as_str());
        self.push(key, value)
    }

    /// `filters[a][$in][0]=x&filters[a][$in][1]=y`
    pub fn filter_in<V: ToString>(mut self, path: &[&str], values: &[V]) -> Self {
        let base = format!("{}[{}]", bracketed("filters", path), FilterOp::In.as_str());
        for (i, value) in values.iter().enumerate() {
            self.pairs.push((format!("{}[{}]", base, i), value.to_string()));
        }
        self
    }

    /// One branch of a top-level `$or`: `filters[$or][group][a][$op]=value`
    pub fn or_filter(self, group: usize, path: &[&str], op: FilterOp, value: impl ToString) -> Self {
        let group = group.to_string();
        let mut full: Vec<&str> = vec!["$or", group.as_str()];
        full.extend_from_slice(path);
        self.filter(&full, op, value)
    }

    /// `populate[rel]=true`
    pub fn populate(self, relation: &str) -> Self {
        self.push(bracketed("populate", &[relation]), "true")
    }

    /// `populate[rel][fields][i]=field`
    pub fn populate_fields(mut self, relation: &str, fields: &[&str]) -> Self {
        for (i, field) in fields.iter().enumerate() {
            let index = i.to_string();
            let key = bracketed("populate", &[relation, "fields", index.as_str()]);
            self.pairs.push((key, field.to_string()));
        }
        self
    }

    /// `populate[rel][populate][child]=true`
    pub fn populate_nested(self, relation: &str, child: &str) -> Self {
        self.push(bracketed("populate", &[relation, "populate", child]), "true")
    }

    /// `fields[i]=field`
    pub fn fields(mut self, fields: &[&str]) -> Self {
        for field in fields {
            let index = self.field_count.to_string();
            let key = bracketed("fields", &[index.as_str()]);
            self.pairs.push((key, field.to_string()));
            self.field_count += 1;
        }
        self
    }

    /// `sort[i]=field:dir`
    pub fn sort(mut self, field: &str, dir: SortDir) -> Self {
        let dir = match dir {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        };
        let index = self.sort_count.to_string();
        let key = bracketed("sort", &[index.as_str()]);
        self.sort_count += 1;
        self.push(key, format!("{}:{}", field, dir))
    }

    pub fn page(self, page: u32, page_size: u32) -> Self {
        self.push("pagination[page]".to_string(), page)
            .push("pagination[pageSize]".to_string(), page_size)
    }

    pub fn status(self, status: Status) -> Self {
        let value = match status {
            Status::Published => "published",
            Status::Draft => "draft",
        };
        self.push("status".to_string(), value)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Form-encoded query string without the leading `?`
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }

    /// Short stable digest of the query, used in cache keys
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_query_string().as_bytes());
        hex::encode(&digest[..8])
    }
}
